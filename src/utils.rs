use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{le_u16, le_u32},
    IResult,
};

pub struct Utils;

impl Utils {
    /// Space separated lowercase hex, the way frames show up in the logs.
    pub fn hex(data: &[u8]) -> String {
        data.iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn le_u16_div10(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_u16, |v| f64::from(v) / 10.0)(input)
    }

    pub fn le_u16_div100(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_u16, |v| f64::from(v) / 100.0)(input)
    }

    pub fn le_u32_div100(input: &[u8]) -> IResult<&[u8], f64> {
        map(le_u32, |v| f64::from(v) / 100.0)(input)
    }

    // 16 bytes of ASCII, padded with spaces or NULs
    pub fn ascii_serial(input: &[u8]) -> IResult<&[u8], String> {
        map(take(16usize), |s: &[u8]| {
            String::from_utf8_lossy(s)
                .trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string()
        })(input)
    }
}
