// Target ASN and User-Agent validation, plus the interactive prompt used when
// either value is missing from the command line and config file

use std::io::{BufRead, Write};

use crate::error::{AppError, AppResult};

pub const MAX_ASN: u64 = 4_294_967_295;

/// Parse an ASN as typed by a user: "6939", "AS6939" or "as6939".
///
/// Both the flag path and the interactive prompt go through this function so
/// they always agree on which values are accepted.
pub fn parse_asn(input: &str) -> AppResult<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidAsn("ASN cannot be empty".to_string()));
    }

    let value = asn_number(trimmed)
        .ok_or_else(|| AppError::InvalidAsn(format!("'{}' is not a numeric ASN", trimmed)))?;

    if value <= 0 || value as u64 > MAX_ASN {
        return Err(AppError::InvalidAsn(format!(
            "{} is outside 1..={}",
            value, MAX_ASN
        )));
    }

    Ok(value as u32)
}

// Signed so that "-5" reads as out of range rather than as garbage
fn asn_number(input: &str) -> Option<i64> {
    let digits = match input.get(..2) {
        Some(marker) if marker.eq_ignore_ascii_case("as") => &input[2..],
        _ => input,
    };
    digits.trim().parse().ok()
}

/// bgp.tools asks for a contact address in the User-Agent.
pub fn validate_user_agent(input: &str) -> AppResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUserAgent("User-Agent cannot be empty".to_string()));
    }
    if !trimmed.contains('@') {
        return Err(AppError::InvalidUserAgent(format!(
            "'{}' does not contain an email address",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// Line-oriented prompt over any reader/writer pair
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }

    pub fn banner(&mut self) -> AppResult<()> {
        writeln!(self.output, "BGP.Tools Peering Analysis Tool")?;
        writeln!(self.output, "{}", "=".repeat(50))?;
        Ok(())
    }

    /// Ask until a valid ASN is entered. EOF on input is an error.
    pub fn ask_asn(&mut self) -> AppResult<u32> {
        loop {
            let line = self.ask("Enter ASN to analyze (e.g., 6939): ")?;
            if line.is_empty() {
                writeln!(self.output, "ASN cannot be empty. Please try again.")?;
                continue;
            }
            if asn_number(&line).is_none() {
                writeln!(self.output, "Invalid ASN format. Please enter a numeric ASN.")?;
                continue;
            }
            match parse_asn(&line) {
                Ok(asn) => return Ok(asn),
                Err(_) => {
                    writeln!(
                        self.output,
                        "ASN must be between 1 and {}. Please try again.",
                        MAX_ASN
                    )?;
                }
            }
        }
    }

    /// Ask until a User-Agent containing '@' is entered.
    pub fn ask_user_agent(&mut self) -> AppResult<String> {
        loop {
            let line = self.ask("Enter User-Agent (format: 'description - email'): ")?;
            if line.is_empty() {
                writeln!(self.output, "User-Agent cannot be empty. Please try again.")?;
                continue;
            }
            match validate_user_agent(&line) {
                Ok(agent) => return Ok(agent),
                Err(_) => {
                    writeln!(
                        self.output,
                        "User-Agent should include an email address for contact. Please try again."
                    )?;
                }
            }
        }
    }

    fn ask(&mut self, question: &str) -> AppResult<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed before a value was entered",
            )));
        }
        Ok(line.trim().to_string())
    }
}
