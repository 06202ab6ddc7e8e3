#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod bulk;
pub mod bus;
pub mod demo;
pub mod gpio;
pub mod shift;
pub mod sim;

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_number(s: &str) -> AResult<usize> {
	let s = s.trim();
	let parsed = if s.starts_with("0x") || s.starts_with("0X") {
		usize::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<usize>()
	};
	with_context!(("invalid number {:?}", s), Ok(parsed?))
}

#[cfg(test)]
mod tests {
	use super::parse_number;
	use test_log::test;

	#[test]
	fn parses_decimal_and_hex() {
		assert_eq!(parse_number("2048").unwrap(), 2048);
		assert_eq!(parse_number("0x7ff").unwrap(), 0x7ff);
		assert_eq!(parse_number(" 0X10 ").unwrap(), 16);
	}

	#[test]
	fn rejects_garbage() {
		assert!(parse_number("0xzz").is_err());
		assert!(parse_number("-1").is_err());
		assert!(parse_number("").is_err());
	}
}
