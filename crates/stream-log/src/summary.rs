// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! printf-style rendering of record summaries.
//!
//! Connectors describe an event with a message template such as
//! `"\"%1$s\" plugin %2$s"` and a list of arguments. The template grammar is
//! the classic one:
//!
//! ```text
//! %[argnum$][flags][width][.precision]conversion
//! ```
//!
//! - flags: `-` (left-justify), `+` (always sign numbers), `0` or space (pad
//!   character), `'c` (pad with `c`)
//! - conversions: `s d u f F e E x X o b c` and the literal `%%`
//!
//! Unnumbered conversions consume arguments in order; numbered ones
//! (`%2$s`) address an argument directly without moving that cursor.
//! Supplying more arguments than the template uses is fine. Referencing an
//! argument that was not supplied is a [`FormatError`], since a summary with
//! holes in it is worse than no record at all.

use serde_json::Value;

use crate::error::FormatError;

const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Renders `template` against `args`.
pub fn render(template: &str, args: &[&Value]) -> Result<String, FormatError> {
	let mut out = String::with_capacity(template.len());
	let mut chars = template.char_indices().peekable();
	let mut next_arg = 0usize;

	while let Some((offset, c)) = chars.next() {
		if c != '%' {
			out.push(c);
			continue;
		}

		if let Some(&(_, '%')) = chars.peek() {
			chars.next();
			out.push('%');
			continue;
		}

		let mut directive = Directive::default();

		// Either an argument number terminated by '$' or the start of the width.
		let mut digits = String::new();
		while let Some(&(_, d)) = chars.peek() {
			if d.is_ascii_digit() {
				digits.push(d);
				chars.next();
			} else {
				break;
			}
		}
		let mut width_digits = String::new();
		if let Some(&(_, '$')) = chars.peek() {
			chars.next();
			let position: usize = digits.parse().unwrap_or(0);
			if position == 0 {
				return Err(FormatError::ZeroPosition { offset });
			}
			directive.position = Some(position);
		} else if !digits.is_empty() {
			// No argnum: leading zeros are the zero-pad flag, the rest is width.
			let width = digits.trim_start_matches('0');
			if width.len() != digits.len() {
				directive.pad = '0';
			}
			width_digits = width.to_string();
		}

		if width_digits.is_empty() {
			loop {
				match chars.peek() {
					Some(&(_, '-')) => {
						directive.left = true;
						chars.next();
					}
					Some(&(_, '+')) => {
						directive.plus = true;
						chars.next();
					}
					Some(&(_, '0')) => {
						directive.pad = '0';
						chars.next();
					}
					Some(&(_, ' ')) => {
						directive.pad = ' ';
						chars.next();
					}
					Some(&(_, '\'')) => {
						chars.next();
						match chars.next() {
							Some((_, p)) => directive.pad = p,
							None => return Err(FormatError::Unterminated { offset }),
						}
					}
					_ => break,
				}
			}

			while let Some(&(_, d)) = chars.peek() {
				if d.is_ascii_digit() {
					width_digits.push(d);
					chars.next();
				} else {
					break;
				}
			}
		}
		directive.width = width_digits.parse().unwrap_or(0);

		if let Some(&(_, '.')) = chars.peek() {
			chars.next();
			let mut precision = String::new();
			while let Some(&(_, d)) = chars.peek() {
				if d.is_ascii_digit() {
					precision.push(d);
					chars.next();
				} else {
					break;
				}
			}
			directive.precision = Some(precision.parse().unwrap_or(0));
		}

		let Some((_, conversion)) = chars.next() else {
			return Err(FormatError::Unterminated { offset });
		};

		let index = match directive.position {
			Some(position) => position - 1,
			None => {
				let index = next_arg;
				next_arg += 1;
				index
			}
		};

		if !is_conversion(conversion) {
			return Err(FormatError::UnknownConversion { conversion, offset });
		}

		let arg = args.get(index).ok_or(FormatError::MissingArgument {
			position: index + 1,
			supplied: args.len(),
		})?;

		out.push_str(&directive.apply(conversion, arg));
	}

	Ok(out)
}

fn is_conversion(c: char) -> bool {
	matches!(
		c,
		's' | 'd' | 'u' | 'f' | 'F' | 'e' | 'E' | 'x' | 'X' | 'o' | 'b' | 'c'
	)
}

#[derive(Debug)]
struct Directive {
	position: Option<usize>,
	left: bool,
	plus: bool,
	pad: char,
	width: usize,
	precision: Option<usize>,
}

impl Default for Directive {
	fn default() -> Self {
		Self {
			position: None,
			left: false,
			plus: false,
			pad: ' ',
			width: 0,
			precision: None,
		}
	}
}

impl Directive {
	fn apply(&self, conversion: char, arg: &Value) -> String {
		let body = match conversion {
			's' => {
				let s = value_to_string(arg);
				match self.precision {
					Some(p) => s.chars().take(p).collect(),
					None => s,
				}
			}
			'd' => self.signed(value_to_int(arg).to_string()),
			'u' => (value_to_int(arg) as u64).to_string(),
			'f' | 'F' => {
				let precision = self.precision.unwrap_or(DEFAULT_FLOAT_PRECISION);
				self.signed(format!("{:.*}", precision, value_to_float(arg)))
			}
			'e' | 'E' => {
				let precision = self.precision.unwrap_or(DEFAULT_FLOAT_PRECISION);
				let s = self.signed(scientific(value_to_float(arg), precision));
				if conversion == 'E' {
					s.to_uppercase()
				} else {
					s
				}
			}
			'x' => format!("{:x}", value_to_int(arg) as u64),
			'X' => format!("{:X}", value_to_int(arg) as u64),
			'o' => format!("{:o}", value_to_int(arg) as u64),
			'b' => format!("{:b}", value_to_int(arg) as u64),
			'c' => {
				// Padding does not apply to characters.
				return u32::try_from(value_to_int(arg))
					.ok()
					.and_then(char::from_u32)
					.map(String::from)
					.unwrap_or_default();
			}
			_ => String::new(),
		};

		self.pad(body)
	}

	fn signed(&self, s: String) -> String {
		if self.plus && !s.starts_with('-') {
			format!("+{s}")
		} else {
			s
		}
	}

	fn pad(&self, body: String) -> String {
		let len = body.chars().count();
		if len >= self.width {
			return body;
		}
		let fill: String = std::iter::repeat(self.pad).take(self.width - len).collect();

		if self.left {
			return format!("{body}{fill}");
		}

		// Zero padding goes between the sign and the digits.
		if self.pad == '0' && (body.starts_with('-') || body.starts_with('+')) {
			let (sign, digits) = body.split_at(1);
			return format!("{sign}{fill}{digits}");
		}

		format!("{fill}{body}")
	}
}

fn scientific(value: f64, precision: usize) -> String {
	let formatted = format!("{:.*e}", precision, value);
	match formatted.split_once('e') {
		Some((mantissa, exponent)) => {
			let exponent: i32 = exponent.parse().unwrap_or(0);
			let sign = if exponent < 0 { '-' } else { '+' };
			format!("{mantissa}e{sign}{}", exponent.abs())
		}
		None => formatted,
	}
}

/// String form of an argument as it appears in a `%s` conversion.
pub fn value_to_string(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::Bool(true) => "1".to_string(),
		Value::Bool(false) => String::new(),
		Value::Number(n) => match n.as_f64() {
			Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
			_ => n.to_string(),
		},
		Value::String(s) => s.clone(),
		Value::Array(_) | Value::Object(_) => value.to_string(),
	}
}

fn value_to_int(value: &Value) -> i64 {
	match value {
		Value::Null => 0,
		Value::Bool(b) => i64::from(*b),
		Value::Number(n) => n
			.as_i64()
			.or_else(|| n.as_u64().map(|u| u as i64))
			.unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
		Value::String(s) => {
			let prefix = numeric_prefix(s);
			if prefix.contains(|c| matches!(c, '.' | 'e' | 'E')) {
				prefix.parse::<f64>().map(|f| f as i64).unwrap_or(0)
			} else {
				prefix.parse::<i64>().unwrap_or_else(|_| {
					prefix.parse::<f64>().map(|f| f as i64).unwrap_or(0)
				})
			}
		}
		Value::Array(a) => i64::from(!a.is_empty()),
		Value::Object(o) => i64::from(!o.is_empty()),
	}
}

fn value_to_float(value: &Value) -> f64 {
	match value {
		Value::Number(n) => n.as_f64().unwrap_or(0.0),
		Value::String(s) => numeric_prefix(s).parse().unwrap_or(0.0),
		other => value_to_int(other) as f64,
	}
}

/// Longest prefix of `s` (after leading whitespace) that reads as a number.
fn numeric_prefix(s: &str) -> &str {
	let s = s.trim_start();
	let bytes = s.as_bytes();
	let mut end = 0;

	if matches!(bytes.first(), Some(b'+' | b'-')) {
		end = 1;
	}
	let digits_start = end;
	while end < bytes.len() && bytes[end].is_ascii_digit() {
		end += 1;
	}
	let mut has_digits = end > digits_start;

	if end < bytes.len() && bytes[end] == b'.' {
		let mut frac = end + 1;
		while frac < bytes.len() && bytes[frac].is_ascii_digit() {
			frac += 1;
		}
		if frac > end + 1 || has_digits {
			has_digits = has_digits || frac > end + 1;
			end = frac;
		}
	}

	if !has_digits {
		return "";
	}

	if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
		let mut exp = end + 1;
		if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
			exp += 1;
		}
		let exp_digits = exp;
		while exp < bytes.len() && bytes[exp].is_ascii_digit() {
			exp += 1;
		}
		if exp > exp_digits {
			end = exp;
		}
	}

	&s[..end]
}
