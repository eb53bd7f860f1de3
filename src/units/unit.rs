use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// Dimensions – exponents of the base quantities a unit is built from
// ---------------------------------------------------------------------------

/// Exponents of length, mass, time, pixel and photon count.
///
/// Pixels and photons are treated as irreducible base quantities so that
/// `pix` is never silently convertible to a dimensionless number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub pixel: i8,
    pub photon: i8,
}

impl Dimensions {
    pub const NONE: Dimensions = Dimensions::new(0, 0, 0, 0, 0);
    pub const LENGTH: Dimensions = Dimensions::new(1, 0, 0, 0, 0);
    pub const TIME: Dimensions = Dimensions::new(0, 0, 1, 0, 0);
    pub const MASS: Dimensions = Dimensions::new(0, 1, 0, 0, 0);
    pub const FREQUENCY: Dimensions = Dimensions::new(0, 0, -1, 0, 0);
    pub const WAVENUMBER: Dimensions = Dimensions::new(-1, 0, 0, 0, 0);
    pub const VELOCITY: Dimensions = Dimensions::new(1, 0, -1, 0, 0);
    pub const ENERGY: Dimensions = Dimensions::new(2, 1, -2, 0, 0);
    pub const POWER: Dimensions = Dimensions::new(2, 1, -3, 0, 0);
    /// Power per unit area (W m-2), the numerator of every spectral flux density.
    pub const IRRADIANCE: Dimensions = Dimensions::new(0, 1, -3, 0, 0);
    pub const PIXEL: Dimensions = Dimensions::new(0, 0, 0, 1, 0);
    pub const PHOTON: Dimensions = Dimensions::new(0, 0, 0, 0, 1);

    pub const fn new(length: i8, mass: i8, time: i8, pixel: i8, photon: i8) -> Self {
        Dimensions {
            length,
            mass,
            time,
            pixel,
            photon,
        }
    }

    /// Every exponent times `n`, or `None` if one leaves the `i8` range.
    pub fn checked_powi(self, n: i32) -> Option<Self> {
        let n = i8::try_from(n).ok()?;
        Some(Dimensions::new(
            self.length.checked_mul(n)?,
            self.mass.checked_mul(n)?,
            self.time.checked_mul(n)?,
            self.pixel.checked_mul(n)?,
            self.photon.checked_mul(n)?,
        ))
    }

    /// Dimensions of a product, or `None` if an exponent overflows.
    pub fn checked_mul(self, rhs: Dimensions) -> Option<Self> {
        Some(Dimensions::new(
            self.length.checked_add(rhs.length)?,
            self.mass.checked_add(rhs.mass)?,
            self.time.checked_add(rhs.time)?,
            self.pixel.checked_add(rhs.pixel)?,
            self.photon.checked_add(rhs.photon)?,
        ))
    }
}

// ---------------------------------------------------------------------------
// PhysicalType – coarse classification used by the spectral equivalencies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Dimensionless,
    Pixel,
    Length,
    Frequency,
    Energy,
    Wavenumber,
    Velocity,
    Other,
}

impl PhysicalType {
    pub fn of(dims: Dimensions) -> Self {
        match dims {
            Dimensions::NONE => PhysicalType::Dimensionless,
            Dimensions::PIXEL => PhysicalType::Pixel,
            Dimensions::LENGTH => PhysicalType::Length,
            Dimensions::FREQUENCY => PhysicalType::Frequency,
            Dimensions::ENERGY => PhysicalType::Energy,
            Dimensions::WAVENUMBER => PhysicalType::Wavenumber,
            Dimensions::VELOCITY => PhysicalType::Velocity,
            _ => PhysicalType::Other,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhysicalType::Dimensionless => "dimensionless",
            PhysicalType::Pixel => "pixel",
            PhysicalType::Length => "length",
            PhysicalType::Frequency => "frequency",
            PhysicalType::Energy => "energy",
            PhysicalType::Wavenumber => "wavenumber",
            PhysicalType::Velocity => "speed",
            PhysicalType::Other => "unknown",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// A physical unit: an SI scale factor, its dimensions, and the named terms it
/// was written with (kept only for display).
///
/// Two units compare equal when they have the same dimensions and scale,
/// regardless of spelling, so `AA == 0.1 nm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    scale: f64,
    dims: Dimensions,
    /// Bare numeric multiplier, e.g. the `1e-17` in `1e-17 erg / s`.
    factor: f64,
    terms: Vec<(String, i32)>,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Unit {
            scale: 1.0,
            dims: Dimensions::NONE,
            factor: 1.0,
            terms: Vec::new(),
        }
    }

    fn base(symbol: &str, scale: f64, dims: Dimensions) -> Self {
        Unit {
            scale,
            dims,
            factor: 1.0,
            terms: vec![(symbol.to_string(), 1)],
        }
    }

    fn numeric(factor: f64) -> Self {
        Unit {
            scale: factor,
            dims: Dimensions::NONE,
            factor,
            terms: Vec::new(),
        }
    }

    /// Parse an astropy/FITS style unit string such as `erg / (s cm2 AA)`.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Unit::dimensionless());
        }
        let tokens = tokenize(trimmed)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source: trimmed,
        };
        let unit = parser.product()?;
        if parser.pos != tokens.len() {
            return Err(SpectrumError::invalid_unit(trimmed, "unexpected trailing input"));
        }
        Ok(unit)
    }

    pub fn angstrom() -> Self {
        Unit::base("Angstrom", 1e-10, Dimensions::LENGTH)
    }

    pub fn nanometer() -> Self {
        Unit::base("nm", 1e-9, Dimensions::LENGTH)
    }

    pub fn micron() -> Self {
        Unit::base("micron", 1e-6, Dimensions::LENGTH)
    }

    pub fn meter() -> Self {
        Unit::base("m", 1.0, Dimensions::LENGTH)
    }

    pub fn centimeter() -> Self {
        Unit::base("cm", 1e-2, Dimensions::LENGTH)
    }

    pub fn second() -> Self {
        Unit::base("s", 1.0, Dimensions::TIME)
    }

    pub fn hertz() -> Self {
        Unit::base("Hz", 1.0, Dimensions::FREQUENCY)
    }

    pub fn gigahertz() -> Self {
        Unit::base("GHz", 1e9, Dimensions::FREQUENCY)
    }

    pub fn joule() -> Self {
        Unit::base("J", 1.0, Dimensions::ENERGY)
    }

    pub fn erg() -> Self {
        Unit::base("erg", 1e-7, Dimensions::ENERGY)
    }

    pub fn electronvolt() -> Self {
        Unit::base("eV", 1.602_176_634e-19, Dimensions::ENERGY)
    }

    pub fn watt() -> Self {
        Unit::base("W", 1.0, Dimensions::POWER)
    }

    pub fn jansky() -> Self {
        Unit::base("Jy", 1e-26, Dimensions::new(0, 1, -2, 0, 0))
    }

    pub fn pixel() -> Self {
        Unit::base("pix", 1.0, Dimensions::PIXEL)
    }

    pub fn photon() -> Self {
        Unit::base("photon", 1.0, Dimensions::PHOTON)
    }

    pub fn meter_per_second() -> Self {
        Unit::velocity("m", 1.0)
    }

    pub fn km_per_s() -> Self {
        Unit::velocity("km", 1e3)
    }

    fn velocity(length: &str, scale: f64) -> Self {
        Unit {
            scale,
            dims: Dimensions::VELOCITY,
            factor: 1.0,
            terms: vec![(length.to_string(), 1), ("s".to_string(), -1)],
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn physical_type(&self) -> PhysicalType {
        PhysicalType::of(self.dims)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims == Dimensions::NONE
    }

    /// Convertible without any physical assumption (same dimensions).
    pub fn is_equivalent(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Multiplier taking a value in `self` to a value in `target`.
    pub fn conversion_factor(&self, target: &Unit) -> Result<f64> {
        if !self.is_equivalent(target) {
            return Err(SpectrumError::UnitMismatch(format!(
                "'{self}' ({}) and '{target}' ({}) are not convertible",
                self.physical_type(),
                target.physical_type()
            )));
        }
        Ok(self.scale / target.scale)
    }

    /// `self` raised to an integer power.
    pub fn powi(&self, n: i32) -> Result<Unit> {
        let overflow =
            || SpectrumError::invalid_unit(self.to_string(), format!("exponent {n} is out of range"));
        let dims = self.dims.checked_powi(n).ok_or_else(overflow)?;
        let terms = if n == 0 {
            Vec::new()
        } else {
            self.terms
                .iter()
                .map(|(name, p)| p.checked_mul(n).map(|p| (name.clone(), p)))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(overflow)?
        };
        Ok(Unit {
            scale: self.scale.powi(n),
            dims,
            factor: self.factor.powi(n),
            terms,
        })
    }

    pub fn try_mul(&self, other: &Unit) -> Result<Unit> {
        self.combine(other, 1)
    }

    pub fn try_div(&self, other: &Unit) -> Result<Unit> {
        self.combine(other, -1)
    }

    fn combine(&self, other: &Unit, sign: i32) -> Result<Unit> {
        let overflow = || {
            SpectrumError::invalid_unit(
                format!("{self} {} {other}", if sign > 0 { '*' } else { '/' }),
                "combined exponents are out of range",
            )
        };
        let other = other.powi(sign)?;
        let mut terms = self.terms.clone();
        for (name, p) in &other.terms {
            match terms.iter_mut().find(|(n, _)| n == name) {
                Some(existing) => existing.1 = existing.1.checked_add(*p).ok_or_else(overflow)?,
                None => terms.push((name.clone(), *p)),
            }
        }
        terms.retain(|(_, p)| *p != 0);
        Ok(Unit {
            scale: self.scale * other.scale,
            dims: self.dims.checked_mul(other.dims).ok_or_else(overflow)?,
            factor: self.factor * other.factor,
            terms,
        })
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && (self.scale - other.scale).abs() <= 1e-12 * self.scale.abs().max(other.scale.abs())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |name: &str, p: i32| {
            if p == 1 {
                name.to_string()
            } else {
                format!("{name}{p}")
            }
        };
        let mut numer: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, p)| *p > 0)
            .map(|(n, p)| render(n, *p))
            .collect();
        let denom: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, p)| *p < 0)
            .map(|(n, p)| render(n, -p))
            .collect();
        if self.factor != 1.0 {
            numer.insert(0, format!("{:e}", self.factor));
        }

        match (numer.is_empty(), denom.len()) {
            (true, 0) => Ok(()),
            (false, 0) => write!(f, "{}", numer.join(" ")),
            (n_empty, d_len) => {
                let top = if n_empty { "1".to_string() } else { numer.join(" ") };
                if d_len == 1 {
                    write!(f, "{top} / {}", denom[0])
                } else {
                    write!(f, "{top} / ({})", denom.join(" "))
                }
            }
        }
    }
}

impl FromStr for Unit {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s)
    }
}

impl TryFrom<String> for Unit {
    type Error = SpectrumError;

    fn try_from(s: String) -> Result<Self> {
        Unit::parse(&s)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> String {
        unit.to_string()
    }
}

// ---------------------------------------------------------------------------
// Symbol table
// ---------------------------------------------------------------------------

/// (symbol, SI scale, dimensions, accepts SI prefixes)
const SYMBOLS: &[(&str, f64, Dimensions, bool)] = &[
    ("m", 1.0, Dimensions::LENGTH, true),
    ("s", 1.0, Dimensions::TIME, true),
    ("g", 1e-3, Dimensions::MASS, true),
    ("Hz", 1.0, Dimensions::FREQUENCY, true),
    ("J", 1.0, Dimensions::ENERGY, true),
    ("W", 1.0, Dimensions::POWER, true),
    ("eV", 1.602_176_634e-19, Dimensions::ENERGY, true),
    ("Jy", 1e-26, Dimensions::new(0, 1, -2, 0, 0), true),
    ("pc", 3.085_677_581_491_367_3e16, Dimensions::LENGTH, true),
    ("erg", 1e-7, Dimensions::ENERGY, false),
    ("Ry", 13.605_693_122_994 * 1.602_176_634e-19, Dimensions::ENERGY, false),
    ("AA", 1e-10, Dimensions::LENGTH, false),
    ("Angstrom", 1e-10, Dimensions::LENGTH, false),
    ("angstrom", 1e-10, Dimensions::LENGTH, false),
    ("Å", 1e-10, Dimensions::LENGTH, false),
    ("micron", 1e-6, Dimensions::LENGTH, false),
    ("au", 1.495_978_707e11, Dimensions::LENGTH, false),
    ("AU", 1.495_978_707e11, Dimensions::LENGTH, false),
    ("min", 60.0, Dimensions::TIME, false),
    ("h", 3600.0, Dimensions::TIME, false),
    ("d", 86400.0, Dimensions::TIME, false),
    ("day", 86400.0, Dimensions::TIME, false),
    ("yr", 3.155_76e7, Dimensions::TIME, false),
    ("pix", 1.0, Dimensions::PIXEL, false),
    ("pixel", 1.0, Dimensions::PIXEL, false),
    ("ph", 1.0, Dimensions::PHOTON, false),
    ("photon", 1.0, Dimensions::PHOTON, false),
];

const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("\u{b5}", 1e-6),
    ("\u{3bc}", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

fn lookup_symbol(name: &str) -> Option<(f64, Dimensions)> {
    if let Some(&(_, scale, dims, _)) = SYMBOLS.iter().find(|(s, ..)| *s == name) {
        return Some((scale, dims));
    }
    PREFIXES.iter().find_map(|(prefix, factor)| {
        let rest = name.strip_prefix(prefix)?;
        SYMBOLS
            .iter()
            .find(|(s, _, _, prefixable)| *prefixable && *s == rest)
            .map(|&(_, scale, dims, _)| (factor * scale, dims))
    })
}

// ---------------------------------------------------------------------------
// Tokenizer / parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Name(String),
    Exp(i32),
    Mul,
    Div,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                let (exp, next) = read_exponent(&chars, i + 2, src)?;
                tokens.push(Token::Exp(exp));
                i = next;
            }
            '^' => {
                let (exp, next) = read_exponent(&chars, i + 1, src)?;
                tokens.push(Token::Exp(exp));
                i = next;
            }
            '*' | '.' | '\u{b7}' => {
                tokens.push(Token::Mul);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Div);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '-' || chars[j] == '+') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| SpectrumError::invalid_unit(src, format!("bad number '{text}'")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_alphabetic() {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));

                // Attached exponent: `cm2`, `s-1`.
                let signed = i + 1 < chars.len()
                    && (chars[i] == '-' || chars[i] == '+')
                    && chars[i + 1].is_ascii_digit();
                if i < chars.len() && (chars[i].is_ascii_digit() || signed) {
                    let (exp, next) = read_exponent(&chars, i, src)?;
                    tokens.push(Token::Exp(exp));
                    i = next;
                }
            }
            other => {
                return Err(SpectrumError::invalid_unit(
                    src,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Read an integer exponent starting at `i`, optionally parenthesised.
fn read_exponent(chars: &[char], mut i: usize, src: &str) -> Result<(i32, usize)> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let parenthesised = chars.get(i) == Some(&'(');
    if parenthesised {
        i += 1;
    }
    let start = i;
    if i < chars.len() && (chars[i] == '-' || chars[i] == '+') {
        i += 1;
    }
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let text: String = chars[start..i].iter().collect();
    let exp = text
        .parse::<i32>()
        .map_err(|_| SpectrumError::invalid_unit(src, "exponents must be integers"))?;
    if parenthesised {
        if chars.get(i) != Some(&')') {
            return Err(SpectrumError::invalid_unit(src, "unbalanced parenthesis in exponent"));
        }
        i += 1;
    }
    Ok((exp, i))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// `a b / c d` parses as `a * b / c * d`: `/` binds to the next term only.
    fn product(&mut self) -> Result<Unit> {
        let mut acc = self.power()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.pos += 1;
                    acc = acc.try_mul(&self.power()?)?;
                }
                Some(Token::Div) => {
                    self.pos += 1;
                    acc = acc.try_div(&self.power()?)?;
                }
                Some(Token::Num(_)) | Some(Token::Name(_)) | Some(Token::LParen) => {
                    acc = acc.try_mul(&self.power()?)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn power(&mut self) -> Result<Unit> {
        let mut base = self.factor()?;
        while let Some(Token::Exp(n)) = self.peek() {
            base = base.powi(*n)?;
            self.pos += 1;
        }
        Ok(base)
    }

    fn factor(&mut self) -> Result<Unit> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| SpectrumError::invalid_unit(self.source, "unexpected end of input"))?;
        self.pos += 1;
        match token {
            Token::Num(v) if v == 1.0 => Ok(Unit::dimensionless()),
            Token::Num(v) => Ok(Unit::numeric(v)),
            Token::Name(name) => {
                let (scale, dims) = lookup_symbol(&name).ok_or_else(|| {
                    SpectrumError::invalid_unit(self.source, format!("unknown unit '{name}'"))
                })?;
                Ok(Unit::base(&name, scale, dims))
            }
            Token::LParen => {
                let inner = self.product()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(SpectrumError::invalid_unit(self.source, "unbalanced parenthesis")),
                }
            }
            other => Err(SpectrumError::invalid_unit(
                self.source,
                format!("unexpected token {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
    }

    #[test]
    fn parses_simple_symbols_and_prefixes() {
        let aa: Unit = "Angstrom".parse().unwrap();
        assert_eq!(aa, Unit::angstrom());
        assert_eq!(Unit::parse("AA").unwrap(), Unit::parse("0.1 nm").unwrap());
        assert!(close(Unit::parse("GHz").unwrap().scale(), 1e9));
        assert!(close(Unit::parse("mJy").unwrap().scale(), 1e-29));
        assert_eq!(Unit::parse("pix").unwrap().physical_type(), PhysicalType::Pixel);
        assert_eq!(Unit::parse("min").unwrap().scale(), 60.0);
    }

    #[test]
    fn flux_density_spellings_agree() {
        let a = Unit::parse("erg/s/cm2/AA").unwrap();
        let b = Unit::parse("erg / (s cm2 Angstrom)").unwrap();
        let c = Unit::parse("erg s-1 cm-2 AA-1").unwrap();
        let d = Unit::parse("erg*s**-1*cm^-2*Angstrom^(-1)").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert_eq!(a.dims(), Dimensions::new(-1, 1, -3, 0, 0));
        assert!(close(a.scale(), 1e-7 / 1e-4 / 1e-10));
    }

    #[test]
    fn numeric_prefix_scales_the_unit() {
        let u = Unit::parse("1e-17 erg/s/cm2/AA").unwrap();
        let base = Unit::parse("erg/s/cm2/AA").unwrap();
        assert!(close(u.conversion_factor(&base).unwrap(), 1e-17));
        let v = Unit::parse("10^-17 erg/s/cm2/AA").unwrap();
        assert_eq!(u, v);
    }

    #[test]
    fn velocity_composition_and_display() {
        let kms = Unit::parse("km/s").unwrap();
        assert_eq!(kms, Unit::km_per_s());
        assert_eq!(kms.physical_type(), PhysicalType::Velocity);
        assert_eq!(kms.to_string(), "km / s");
        assert_eq!(Unit::parse("erg / (s cm2)").unwrap().to_string(), "erg / (s cm2)");
        assert_eq!(Unit::parse("1/s").unwrap().to_string(), "1 / s");
    }

    #[test]
    fn display_reparses_to_the_same_unit() {
        for s in ["erg/s/cm2/AA", "photon / (cm2 s Angstrom)", "W m-2 Hz-1", "1e-17 Jy"] {
            let u = Unit::parse(s).unwrap();
            let again = Unit::parse(&u.to_string()).unwrap();
            assert_eq!(u, again, "{s} -> {u}");
        }
    }

    #[test]
    fn conversion_factor_rejects_other_dimensions() {
        let err = Unit::angstrom().conversion_factor(&Unit::hertz()).unwrap_err();
        assert!(matches!(err, SpectrumError::UnitMismatch(_)));
        assert!(close(Unit::angstrom().conversion_factor(&Unit::nanometer()).unwrap(), 0.1));
    }

    #[test]
    fn garbage_is_an_invalid_unit() {
        for s in ["blah", "erg/(s", "cm^x", "m$"] {
            assert!(
                matches!(Unit::parse(s), Err(SpectrumError::InvalidUnit { .. })),
                "{s} should not parse"
            );
        }
    }

    #[test]
    fn oversized_exponents_are_an_invalid_unit() {
        for s in ["m^100 m^100", "m^200", "m2^100", "(s-1)^-128", "erg^70"] {
            assert!(
                matches!(Unit::parse(s), Err(SpectrumError::InvalidUnit { .. })),
                "{s} should not parse"
            );
        }
        assert_eq!(Unit::parse("m^127").unwrap().dims().length, 127);
        let big = Unit::parse("m^100").unwrap();
        assert!(big.try_mul(&big).is_err());
        assert!(big.powi(2).is_err());
    }

    #[test]
    fn empty_string_is_dimensionless() {
        assert!(Unit::parse("").unwrap().is_dimensionless());
        assert!(Unit::parse("  ").unwrap().is_dimensionless());
    }

    #[test]
    fn unit_round_trips_through_serde() {
        let u = Unit::parse("km / s").unwrap();
        let json = serde_json::to_string(&u).unwrap();
        assert_eq!(json, "\"km / s\"");
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, u);
    }
}
