//! Narrow numeric-expression parser.
//!
//! Decides whether a chat message denotes exactly one integer: a literal, or an
//! arithmetic expression over literals that evaluates to a whole number.
//! Values are exact rationals so `4/2` counts as `2` while `2/4` does not count.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := atom (('^' | '**') unary)?
//! atom    := number | '(' expr ')'
//! number  := mantissa (('e' | 'E') ('+' | '-')? digits)?
//! mantissa:= digits ('.' digits?)? | '.' digits
//! ```

/// Largest exponent magnitude we are willing to evaluate.
const MAX_EXPONENT: u32 = 256;
/// Guards against pathological nesting like `((((((...`.
const MAX_DEPTH: usize = 64;

/// Parse `text` and return its value when it is an integer.
pub fn parse_integer(text: &str) -> Option<i128> {
    let value = parse_rational(text)?;
    if value.den == 1 {
        Some(value.num)
    } else {
        None
    }
}

/// Exact rational number, always normalized (`den > 0`, `gcd(num, den) == 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub num: i128,
    pub den: i128,
}

impl Rational {
    fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let (mut num, mut den) = (num, den);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        if g > 1 {
            let g = i128::try_from(g).ok()?;
            num /= g;
            den /= g;
        }
        Some(Self { num, den })
    }

    fn add(self, rhs: Self) -> Option<Self> {
        let num = self
            .num
            .checked_mul(rhs.den)?
            .checked_add(rhs.num.checked_mul(self.den)?)?;
        Self::new(num, self.den.checked_mul(rhs.den)?)
    }

    fn sub(self, rhs: Self) -> Option<Self> {
        self.add(rhs.neg()?)
    }

    fn mul(self, rhs: Self) -> Option<Self> {
        Self::new(
            self.num.checked_mul(rhs.num)?,
            self.den.checked_mul(rhs.den)?,
        )
    }

    fn div(self, rhs: Self) -> Option<Self> {
        Self::new(
            self.num.checked_mul(rhs.den)?,
            self.den.checked_mul(rhs.num)?,
        )
    }

    fn neg(self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    fn pow(self, exp: Self) -> Option<Self> {
        if exp.den != 1 {
            return None;
        }
        let magnitude = u32::try_from(exp.num.unsigned_abs()).ok()?;
        if magnitude > MAX_EXPONENT {
            return None;
        }
        let num = self.num.checked_pow(magnitude)?;
        let den = self.den.checked_pow(magnitude)?;
        if exp.num < 0 {
            Self::new(den, num)
        } else {
            Self::new(num, den)
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Parse `text` as a complete arithmetic expression.
pub fn parse_rational(text: &str) -> Option<Rational> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return None;
    }
    Some(value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Num(Rational),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut out = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(idx, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if ch.is_ascii_digit() || ch == '.' {
            let mut end = idx;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_digit() || c == '.' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(len) = exponent_len(&text[end..]) {
                // Exponent suffixes are ASCII, so chars and bytes line up.
                for _ in 0..len {
                    chars.next();
                }
                end += len;
            }
            out.push(Token::Num(parse_number(&text[idx..end])?));
            continue;
        }

        chars.next();
        let token = match ch {
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' if matches!(chars.peek(), Some(&(_, '*'))) => {
                chars.next();
                Token::Pow
            }
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '^' => Token::Pow,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => return None,
        };
        out.push(token);
    }

    Some(out)
}

/// Length of an `e[+-]digits` suffix at the start of `rest`, if there is one.
/// A bare `e` is not consumed and later fails as an unknown token.
fn exponent_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return None;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'+' | b'-')));
    let digits = bytes[1 + sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (digits > 0).then_some(1 + sign + digits)
}

/// Decimal literal to an exact rational: `2.50` is `5/2`, `1.5e2` is `150`.
fn parse_number(lit: &str) -> Option<Rational> {
    let (mantissa, exponent) = match lit.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (lit, None),
    };
    let value = parse_decimal(mantissa)?;
    let Some(exponent) = exponent else {
        return Some(value);
    };

    let exponent: i64 = exponent.parse().ok()?;
    let magnitude = u32::try_from(exponent.unsigned_abs()).ok()?;
    if magnitude > MAX_EXPONENT {
        return None;
    }
    let scale = Rational::new(10i128.checked_pow(magnitude)?, 1)?;
    if exponent < 0 {
        value.div(scale)
    } else {
        value.mul(scale)
    }
}

fn parse_decimal(lit: &str) -> Option<Rational> {
    let (int_part, frac_part) = match lit.split_once('.') {
        Some((i, f)) => (i, f),
        None => (lit, ""),
    };
    if frac_part.contains('.') || (int_part.is_empty() && frac_part.is_empty()) {
        return None;
    }

    let mut num: i128 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        num = num.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    let scale = u32::try_from(frac_part.len()).ok()?;
    let den = 10i128.checked_pow(scale)?;
    Rational::new(num, den)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.peek()?;
        self.pos += 1;
        Some(t)
    }

    fn expr(&mut self) -> Option<Rational> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = acc.add(self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = acc.sub(self.term()?)?;
                }
                _ => return Some(acc),
            }
        }
    }

    fn term(&mut self) -> Option<Rational> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc = acc.mul(self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    acc = acc.div(self.unary()?)?;
                }
                _ => return Some(acc),
            }
        }
    }

    fn unary(&mut self) -> Option<Rational> {
        self.enter()?;
        let value = match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().and_then(Rational::neg)
            }
            _ => self.power(),
        };
        self.depth -= 1;
        value
    }

    fn power(&mut self) -> Option<Rational> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            // Right-associative: 2^3^2 == 2^(3^2).
            let exp = self.unary()?;
            return base.pow(exp);
        }
        Some(base)
    }

    fn atom(&mut self) -> Option<Rational> {
        match self.bump()? {
            Token::Num(n) => Some(n),
            Token::LParen => {
                self.enter()?;
                let inner = self.expr();
                self.depth -= 1;
                let inner = inner?;
                match self.bump()? {
                    Token::RParen => Some(inner),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn enter(&mut self) -> Option<()> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        Some(())
    }
}
