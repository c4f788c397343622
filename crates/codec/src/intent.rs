use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the board's three indicator LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Blue];

    /// Lowercase symbol turns the LED on, uppercase turns it off.
    pub fn on_symbol(self) -> u8 {
        match self {
            Color::Red => b'r',
            Color::Green => b'g',
            Color::Blue => b'b',
        }
    }

    pub fn off_symbol(self) -> u8 {
        self.on_symbol().to_ascii_uppercase()
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        }
    }
}

/// Board mode, 0 through 4: none, red, blue, green, all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Mode(u8);

impl Mode {
    pub const MAX: u8 = 4;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Which LEDs the board lights in this mode, as `(red, green, blue)`.
    pub fn lit(self) -> (bool, bool, bool) {
        match self.0 {
            1 => (true, false, false),
            2 => (false, false, true),
            3 => (false, true, false),
            4 => (true, true, true),
            _ => (false, false, false),
        }
    }

    /// Roman numeral label used on the board's front panel ("O" for mode 0).
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "I",
            2 => "II",
            3 => "III",
            4 => "IV",
            _ => "O",
        }
    }

    pub fn symbol(self) -> u8 {
        b'0' + self.0
    }
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Mode::new(value).ok_or_else(|| format!("mode {} out of range 0..=4", value))
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode.0
    }
}

/// Application-level request, prior to wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    ColorOn(Color),
    ColorOff(Color),
    AllOn,
    AllOff,
    SetMode(Mode),
    QueryState,
}

impl Intent {
    /// Every intent the board understands, in wire-alphabet order.
    pub fn all() -> Vec<Intent> {
        let mut intents = Vec::with_capacity(14);
        for color in Color::ALL {
            intents.push(Intent::ColorOn(color));
            intents.push(Intent::ColorOff(color));
        }
        intents.push(Intent::AllOn);
        intents.push(Intent::AllOff);
        intents.extend((0..=Mode::MAX).filter_map(Mode::new).map(Intent::SetMode));
        intents.push(Intent::QueryState);
        intents
    }

    /// Reverse of [`encode`] for a single wire symbol.
    pub fn from_symbol(symbol: u8) -> Option<Intent> {
        let intent = match symbol {
            b'r' => Intent::ColorOn(Color::Red),
            b'R' => Intent::ColorOff(Color::Red),
            b'g' => Intent::ColorOn(Color::Green),
            b'G' => Intent::ColorOff(Color::Green),
            b'b' => Intent::ColorOn(Color::Blue),
            b'B' => Intent::ColorOff(Color::Blue),
            b'a' => Intent::AllOn,
            b'A' => Intent::AllOff,
            b's' => Intent::QueryState,
            b'0'..=b'4' => Intent::SetMode(Mode(symbol - b'0')),
            _ => return None,
        };
        Some(intent)
    }

    /// True for intents that toggle LEDs directly (the `rRgGbBaA` subset).
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            Intent::ColorOn(_) | Intent::ColorOff(_) | Intent::AllOn | Intent::AllOff
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::ColorOn(color) => write!(f, "{} on", color.name()),
            Intent::ColorOff(color) => write!(f, "{} off", color.name()),
            Intent::AllOn => write!(f, "all on"),
            Intent::AllOff => write!(f, "all off"),
            Intent::SetMode(mode) => write!(f, "mode {}", mode.value()),
            Intent::QueryState => write!(f, "query"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown command '{0}': use a symbol (r R g G b B a A 0-4 s) or e.g. 'red on', 'mode 2', 'query'")]
pub struct ParseIntentError(pub String);

impl FromStr for Intent {
    type Err = ParseIntentError;

    /// Accepts a bare wire symbol (`r`, `A`, `3`, `s`) or a short phrase
    /// such as `red on`, `all off`, `mode 2`, `query`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let err = || ParseIntentError(text.to_string());

        if let [symbol] = text.as_bytes() {
            return Intent::from_symbol(*symbol).ok_or_else(err);
        }

        let lower = text.to_ascii_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        match words.as_slice() {
            ["query"] | ["status"] => Ok(Intent::QueryState),
            ["mode", n] => n
                .parse::<u8>()
                .ok()
                .and_then(Mode::new)
                .map(Intent::SetMode)
                .ok_or_else(err),
            ["all", "on"] => Ok(Intent::AllOn),
            ["all", "off"] => Ok(Intent::AllOff),
            [color, state] => {
                let color = Color::ALL
                    .into_iter()
                    .find(|c| c.name() == *color)
                    .ok_or_else(err)?;
                match *state {
                    "on" => Ok(Intent::ColorOn(color)),
                    "off" => Ok(Intent::ColorOff(color)),
                    _ => Err(err()),
                }
            }
            _ => Err(err()),
        }
    }
}

/// A single ASCII character from the board's fixed command alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(u8);

impl Command {
    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        char::from(self.0)
    }

    pub fn is_query(self) -> bool {
        self.0 == b's'
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Map an intent onto its wire symbol.
pub fn encode(intent: Intent) -> Command {
    let symbol = match intent {
        Intent::ColorOn(color) => color.on_symbol(),
        Intent::ColorOff(color) => color.off_symbol(),
        Intent::AllOn => b'a',
        Intent::AllOff => b'A',
        Intent::SetMode(mode) => mode.symbol(),
        Intent::QueryState => b's',
    };
    Command(symbol)
}
