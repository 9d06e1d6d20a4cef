use phf::phf_map;

static MORSE_TABLE: phf::Map<&'static str, &'static str> = phf_map! {
    "A" => ".-",
    "B" => "-...",
    "C" => "-.-.",
    "D" => "-..",
    "E" => ".",
    "F" => "..-.",
    "G" => "--.",
    "H" => "....",
    "I" => "..",
    "J" => ".---",
    "K" => "-.-",
    "L" => ".-..",
    "M" => "--",
    "N" => "-.",
    "O" => "---",
    "P" => ".--.",
    "Q" => "--.-",
    "R" => ".-.",
    "S" => "...",
    "T" => "-",
    "U" => "..-",
    "V" => "...-",
    "W" => ".--",
    "X" => "-..-",
    "Y" => "-.--",
    "Z" => "--..",
    "0" => "-----",
    "1" => ".----",
    "2" => "..---",
    "3" => "...--",
    "4" => "....-",
    "5" => ".....",
    "6" => "-....",
    "7" => "--...",
    "8" => "---..",
    "9" => "----.",
    "." => ".-.-.-",
    "," => "--..--",
    "?" => "..--..",
    "'" => ".----.",
    "!" => "-.-.--",
    "/" => "-..-.",
    "(" => "-.--.",
    ")" => "-.--.-",
    "&" => ".-...",
    ":" => "---...",
    ";" => "-.-.-.",
    "=" => "-...-",
    "+" => ".-.-.",
    "-" => "-....-",
    "_" => "..--.-",
    "\"" => ".-..-.",
    "$" => "...-..-",
    "@" => ".--.-.",
    // Prosigns, sent as one run without inter-character gaps.
    "AR" => ".-.-.",
    "AS" => ".-...",
    "BT" => "-...-",
    "CT" => "-.-.-",
    "KN" => "-.--.",
    "SK" => "...-.-",
    "SN" => "...-.",
    "SOS" => "...---...",
};

/// Pattern sent for any token missing from the table.
const UNKNOWN_PATTERN: &str = "........";

/// A single keyed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Dot,
    Dash,
}

/// Look up the symbols for a character or prosign token, ignoring case.
///
/// Tokens that are not in the table resolve to eight dots, the conventional
/// "error" signal, so this never fails.
pub fn encode(token: &str) -> Vec<Symbol> {
    let key = token.to_uppercase();
    let pattern = MORSE_TABLE
        .get(key.as_str())
        .copied()
        .unwrap_or(UNKNOWN_PATTERN);
    pattern
        .chars()
        .filter_map(|mark| match mark {
            '.' => Some(Symbol::Dot),
            '-' => Some(Symbol::Dash),
            _ => None,
        })
        .collect()
}

/// Return true if `token` has its own table entry.
pub fn is_known(token: &str) -> bool {
    MORSE_TABLE.contains_key(token.to_uppercase().as_str())
}

/// True for tokens that stand for a gap between words.
pub fn is_word_space(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_whitespace)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    UnterminatedProsign(usize),
    UnexpectedBracket(usize),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::UnterminatedProsign(pos) => {
                write!(f, "unterminated prosign starting at byte {}", pos)
            }
            EncodeError::UnexpectedBracket(pos) => {
                write!(f, "unexpected prosign bracket at byte {}", pos)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Split text into tokens for sending.
///
/// Each character becomes its own token, `<AR>` style brackets produce one
/// multi-letter prosign token, and each run of whitespace outside brackets
/// becomes a single `" "` word-space token.
pub fn tokenize(text: &str) -> Result<Vec<String>, EncodeError> {
    let mut tokens = Vec::new();
    let mut prosign: Option<(usize, String)> = None;
    let mut last_was_space = false;

    for (idx, ch) in text.char_indices() {
        if ch == '<' {
            if prosign.is_some() {
                return Err(EncodeError::UnexpectedBracket(idx));
            }
            prosign = Some((idx, String::new()));
            continue;
        }

        if ch == '>' {
            match prosign.take() {
                Some((_, name)) => {
                    if !name.is_empty() {
                        tokens.push(name);
                        last_was_space = false;
                    }
                }
                None => return Err(EncodeError::UnexpectedBracket(idx)),
            }
            continue;
        }

        if ch.is_whitespace() {
            if prosign.is_none() && !last_was_space {
                tokens.push(" ".to_string());
                last_was_space = true;
            }
            continue;
        }

        match prosign.as_mut() {
            Some((_, name)) => name.push(ch),
            None => {
                tokens.push(ch.to_string());
                last_was_space = false;
            }
        }
    }

    if let Some((start, _)) = prosign {
        return Err(EncodeError::UnterminatedProsign(start));
    }

    Ok(tokens)
}
