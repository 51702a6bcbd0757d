//! Content stream tokenizer and writer.
//!
//! [`tokenize`] turns raw content-stream bytes into [`Operator`]s. Every
//! operator remembers the byte range it was read from, so an editor can
//! splice replacements into the original stream and leave everything else
//! byte-for-byte intact. [`Operator::write`] serializes operators back.

use std::ops::Range;

use crate::error::BackendError;

/// A PDF content stream operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    /// Name without the leading `/`.
    Name(String),
    /// Literal string `(...)`, unescaped.
    LiteralString(Vec<u8>),
    /// Hex string `<...>`, decoded.
    HexString(Vec<u8>),
    Array(Vec<Operand>),
    Boolean(bool),
    Null,
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// Numeric value of an integer or real operand.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(b) | Operand::HexString(b) => Some(b),
            _ => None,
        }
    }
}

/// A content stream operator with its operands.
///
/// Inline images are reported as a single `BI` operator whose operands are
/// the image dictionary and the raw image data.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub name: String,
    pub operands: Vec<Operand>,
    /// Bytes of the source stream covering the operands and the keyword.
    pub span: Range<usize>,
}

impl Operator {
    /// An operator that was not read from a stream.
    pub fn new(name: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            name: name.into(),
            operands,
            span: 0..0,
        }
    }

    /// Append the serialized operator (operands, then keyword) to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        if self.name == "BI" {
            write_inline_image(&self.operands, out);
            return;
        }
        for operand in &self.operands {
            write_operand(operand, out);
            out.push(b' ');
        }
        out.extend_from_slice(self.name.as_bytes());
    }
}

/// Serialize a sequence of operators, one per line.
pub fn write_operators(ops: &[Operator]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        op.write(&mut out);
        out.push(b'\n');
    }
    out
}

/// Parse content stream bytes into operators.
///
/// Comments are skipped. Stray bytes that cannot start a token are ignored.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] for unterminated strings, arrays,
/// dictionaries or inline images, and for malformed numbers.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    Lexer { input, pos: 0 }.run()
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_keyword_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'*' | b'\'' | b'"')
}

fn interp_err(msg: impl Into<String>) -> BackendError {
    BackendError::Interpreter(msg.into())
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Vec<Operator>, BackendError> {
        let mut ops = Vec::new();
        let mut operands = Vec::new();
        let mut op_start: Option<usize> = None;

        loop {
            self.skip_blank();
            let Some(b) = self.peek() else { break };
            let token_start = self.pos;

            if is_keyword_byte(b) {
                let keyword = self.keyword();
                match keyword {
                    "true" => operands.push(Operand::Boolean(true)),
                    "false" => operands.push(Operand::Boolean(false)),
                    "null" => operands.push(Operand::Null),
                    "BI" => {
                        let (dict, data) = self.inline_image()?;
                        operands.clear();
                        ops.push(Operator {
                            name: "BI".to_string(),
                            operands: vec![Operand::Dictionary(dict), Operand::LiteralString(data)],
                            span: op_start.take().unwrap_or(token_start)..self.pos,
                        });
                        continue;
                    }
                    _ => {
                        ops.push(Operator {
                            name: keyword.to_string(),
                            operands: std::mem::take(&mut operands),
                            span: op_start.take().unwrap_or(token_start)..self.pos,
                        });
                        continue;
                    }
                }
                op_start.get_or_insert(token_start);
                continue;
            }

            let operand = match b {
                b']' => return Err(interp_err("unexpected ']' outside array")),
                b'(' | b'<' | b'[' | b'/' | b'0'..=b'9' | b'+' | b'-' | b'.' => self.value()?,
                _ => {
                    self.pos += 1;
                    continue;
                }
            };
            op_start.get_or_insert(token_start);
            operands.push(operand);
        }

        Ok(ops)
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|c| c != b'\n' && c != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Any operand value. Bare keywords inside arrays and dictionaries are
    /// read as names.
    fn value(&mut self) -> Result<Operand, BackendError> {
        match self.peek() {
            Some(b'(') => self.literal_string().map(Operand::LiteralString),
            Some(b'<') if self.peek_at(1) == Some(b'<') => self.dictionary().map(Operand::Dictionary),
            Some(b'<') => self.hex_string().map(Operand::HexString),
            Some(b'[') => self.array().map(Operand::Array),
            Some(b'/') => Ok(Operand::Name(self.name())),
            Some(b'0'..=b'9' | b'+' | b'-' | b'.') => self.number(),
            Some(b) if b.is_ascii_alphabetic() => Ok(match self.keyword() {
                "true" => Operand::Boolean(true),
                "false" => Operand::Boolean(false),
                "null" => Operand::Null,
                other => Operand::Name(other.to_string()),
            }),
            Some(b) => Err(interp_err(format!("unexpected byte 0x{b:02X} in operand"))),
            None => Err(interp_err("unexpected end of stream in operand")),
        }
    }

    fn keyword(&mut self) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(is_keyword_byte) {
            self.pos += 1;
        }
        // Keyword bytes are ASCII.
        std::str::from_utf8(&input[start..self.pos]).unwrap_or("")
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(esc) = self.peek() else { break };
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }

        Err(interp_err("unterminated literal string"))
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b) if is_whitespace(b) => self.pos += 1,
                Some(b) => {
                    digits.push(hex_digit(b)?);
                    self.pos += 1;
                }
                None => return Err(interp_err("unterminated hex string")),
            }
        }
        if digits.len() % 2 != 0 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(interp_err("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_blank();
            match (self.peek(), self.peek_at(1)) {
                (None, _) => return Err(interp_err("unterminated dictionary")),
                (Some(b'>'), Some(b'>')) => {
                    self.pos += 2;
                    return Ok(entries);
                }
                (Some(b'/'), _) => {
                    let key = self.name();
                    self.skip_blank();
                    let value = self.value()?;
                    entries.push((key, value));
                }
                _ => return Err(interp_err("expected name key in dictionary")),
            }
        }
    }

    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_whitespace(b) && !is_delimiter(b))
        {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let mut decoded = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Ok(hi), Ok(lo)) = (hex_digit(raw[i + 1]), hex_digit(raw[i + 2])) {
                    decoded.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            decoded.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&decoded).into_owned()
    }

    fn number(&mut self) -> Result<Operand, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            if b == b'.' && !seen_dot {
                seen_dot = true;
            } else if !b.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| interp_err("invalid number token"))?;
        if seen_dot {
            // "-." and "." are read as zero by most consumers.
            let normalized = match text {
                "." | "-." | "+." => "0",
                t => t,
            };
            normalized
                .parse::<f64>()
                .map(Operand::Real)
                .map_err(|_| interp_err(format!("invalid real number: {text}")))
        } else {
            text.parse::<i64>()
                .map(Operand::Integer)
                .map_err(|_| interp_err(format!("invalid integer: {text}")))
        }
    }

    /// Reads `<dict entries> ID <data> EI` after the `BI` keyword.
    fn inline_image(&mut self) -> Result<(Vec<(String, Operand)>, Vec<u8>), BackendError> {
        let mut dict = Vec::new();
        loop {
            self.skip_blank();
            match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (None, _, _) => return Err(interp_err("inline image without ID")),
                (Some(b'I'), Some(b'D'), next) if next.is_none_or(is_whitespace) => {
                    self.pos += 2;
                    if self.peek().is_some_and(is_whitespace) {
                        self.pos += 1;
                    }
                    break;
                }
                (Some(b'/'), _, _) => {
                    let key = self.name();
                    self.skip_blank();
                    let value = self.value()?;
                    dict.push((key, value));
                }
                _ => return Err(interp_err("expected name key in inline image dictionary")),
            }
        }

        let data_start = self.pos;
        let input = self.input;
        let mut i = data_start;
        while i + 1 < input.len() {
            let preceded = i == data_start || is_whitespace(input[i - 1]);
            let followed = input
                .get(i + 2)
                .is_none_or(|&b| is_whitespace(b) || is_delimiter(b));
            if preceded && followed && input[i] == b'E' && input[i + 1] == b'I' {
                let mut end = i;
                if end > data_start && is_whitespace(input[end - 1]) {
                    end -= 1;
                }
                self.pos = i + 2;
                return Ok((dict, input[data_start..end].to_vec()));
            }
            i += 1;
        }
        Err(interp_err("inline image without EI"))
    }
}

fn hex_digit(b: u8) -> Result<u8, BackendError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(interp_err(format!("invalid hex digit: {:?}", b as char))),
    }
}

/// Append the PDF syntax for `operand` to `out`.
pub fn write_operand(operand: &Operand, out: &mut Vec<u8>) {
    match operand {
        Operand::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Operand::Real(r) => out.extend_from_slice(format_number(*r).as_bytes()),
        Operand::Name(n) => write_name(n, out),
        Operand::LiteralString(bytes) => write_literal_string(bytes, out),
        Operand::HexString(bytes) => {
            out.push(b'<');
            for b in bytes {
                out.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            out.push(b'>');
        }
        Operand::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_operand(item, out);
            }
            out.push(b']');
        }
        Operand::Boolean(v) => out.extend_from_slice(if *v { b"true" } else { b"false" }),
        Operand::Null => out.extend_from_slice(b"null"),
        Operand::Dictionary(entries) => {
            out.extend_from_slice(b"<<");
            for (key, value) in entries {
                write_name(key, out);
                out.push(b' ');
                write_operand(value, out);
                out.push(b' ');
            }
            out.extend_from_slice(b">>");
        }
    }
}

/// Shortest decimal form with at most four fractional digits.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{value:.4}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" || s.is_empty() {
        s = "0".to_string();
    }
    s
}

fn write_name(name: &str, out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name.as_bytes() {
        if b == b'#' || is_whitespace(b) || is_delimiter(b) || !(0x21..=0x7E).contains(&b) {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_literal_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_inline_image(operands: &[Operand], out: &mut Vec<u8>) {
    out.extend_from_slice(b"BI");
    if let Some(Operand::Dictionary(entries)) = operands.first() {
        for (key, value) in entries {
            out.push(b' ');
            write_name(key, out);
            out.push(b' ');
            write_operand(value, out);
        }
    }
    out.extend_from_slice(b" ID ");
    if let Some(data) = operands.get(1).and_then(Operand::as_string_bytes) {
        out.extend_from_slice(data);
    }
    out.extend_from_slice(b"\nEI");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(input: &[u8]) -> Vec<Operator> {
        tokenize(input).unwrap()
    }

    #[test]
    fn numbers() {
        let parsed = ops(b"42 -7 3.14 .5 -.002 +3 0 m");
        assert_eq!(
            parsed[0].operands,
            vec![
                Operand::Integer(42),
                Operand::Integer(-7),
                Operand::Real(3.14),
                Operand::Real(0.5),
                Operand::Real(-0.002),
                Operand::Integer(3),
                Operand::Integer(0),
            ]
        );
    }

    #[test]
    fn font_operator_with_name() {
        let parsed = ops(b"/F1 12 Tf");
        assert_eq!(parsed[0].name, "Tf");
        assert_eq!(parsed[0].operands[0].as_name(), Some("F1"));
        assert_eq!(parsed[0].operands[1].as_f64(), Some(12.0));
    }

    #[test]
    fn name_hex_escape() {
        assert_eq!(ops(b"/F#231 12 Tf")[0].operands[0], Operand::Name("F#1".into()));
    }

    #[test]
    fn literal_string_escapes() {
        let parsed = ops(b"(a\\(b\\)c\\n\\101\\\\) Tj (x(y)z) Tj");
        assert_eq!(parsed[0].operands[0], Operand::LiteralString(b"a(b)c\nA\\".to_vec()));
        assert_eq!(parsed[1].operands[0], Operand::LiteralString(b"x(y)z".to_vec()));
    }

    #[test]
    fn line_continuation_in_string() {
        let parsed = ops(b"(ab\\\ncd) Tj");
        assert_eq!(parsed[0].operands[0], Operand::LiteralString(b"abcd".to_vec()));
    }

    #[test]
    fn hex_strings() {
        let parsed = ops(b"<48 65 6C6C 6F> Tj <ABC> Tj");
        assert_eq!(parsed[0].operands[0], Operand::HexString(b"Hello".to_vec()));
        assert_eq!(parsed[1].operands[0], Operand::HexString(vec![0xAB, 0xC0]));
    }

    #[test]
    fn tj_array_with_kerning() {
        let parsed = ops(b"[(Hel) -120 (lo)] TJ");
        assert_eq!(
            parsed[0].operands[0],
            Operand::Array(vec![
                Operand::LiteralString(b"Hel".to_vec()),
                Operand::Integer(-120),
                Operand::LiteralString(b"lo".to_vec()),
            ])
        );
    }

    #[test]
    fn quote_operators_and_star_keywords() {
        let names: Vec<String> = ops(b"BT (a) ' 1 2 (b) \" T* f* ET")
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, ["BT", "'", "\"", "T*", "f*", "ET"]);
    }

    #[test]
    fn comments_are_skipped() {
        let parsed = ops(b"% header\nq % save\n1 0 0 1 0 0 cm Q");
        let names: Vec<&str> = parsed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["q", "cm", "Q"]);
    }

    #[test]
    fn dictionary_operand() {
        let parsed = ops(b"/Span <</ActualText (x) /MCID 3 /Nested <</A true>>>> BDC EMC");
        assert_eq!(parsed[0].name, "BDC");
        let Operand::Dictionary(entries) = &parsed[0].operands[1] else {
            panic!("expected dictionary");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1], ("MCID".to_string(), Operand::Integer(3)));
    }

    #[test]
    fn spans_cover_operands_and_keyword() {
        let src = b"BT\n/F1 12 Tf\n  (Hi) Tj\nET";
        let parsed = ops(src);
        assert_eq!(&src[parsed[1].span.clone()], b"/F1 12 Tf");
        assert_eq!(&src[parsed[2].span.clone()], b"(Hi) Tj");
        assert_eq!(&src[parsed[3].span.clone()], b"ET");
    }

    #[test]
    fn inline_image() {
        let src = b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xFF EI Q";
        let parsed = ops(src);
        let names: Vec<&str> = parsed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["q", "BI", "Q"]);
        assert_eq!(parsed[1].operands[1], Operand::LiteralString(vec![0x00, 0xFF]));
        let Operand::Dictionary(dict) = &parsed[1].operands[0] else {
            panic!("expected dictionary");
        };
        assert_eq!(dict[0], ("W".to_string(), Operand::Integer(2)));
        assert!(src[parsed[1].span.clone()].ends_with(b"EI"));
    }

    #[test]
    fn malformed_streams_error() {
        assert!(tokenize(b"(unterminated Tj").is_err());
        assert!(tokenize(b"[1 2 3 TJ").is_err());
        assert!(tokenize(b"] Tj").is_err());
        assert!(tokenize(b"BI /W 1 ID abc").is_err());
    }

    #[test]
    fn empty_and_blank_streams() {
        assert!(ops(b"").is_empty());
        assert!(ops(b"  \n\t ").is_empty());
    }

    #[test]
    fn writer_output_reparses_to_same_operators() {
        let src: &[u8] = b"BT /F#201 9.5 Tf [(a\\)b) -250 <00FF>] TJ 0.1 0 0 rg ET";
        let parsed = ops(src);
        let written = write_operators(&parsed);
        let reparsed = ops(&written);
        let strip = |v: Vec<Operator>| -> Vec<(String, Vec<Operand>)> {
            v.into_iter().map(|o| (o.name, o.operands)).collect()
        };
        assert_eq!(strip(parsed), strip(reparsed));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn constructed_operator_writes() {
        let op = Operator::new(
            "Tf",
            vec![Operand::Name("TRFON_dejavu-sans_bold".into()), Operand::Real(10.5)],
        );
        let mut out = Vec::new();
        op.write(&mut out);
        assert_eq!(out, b"/TRFON_dejavu-sans_bold 10.5 Tf");
    }
}
