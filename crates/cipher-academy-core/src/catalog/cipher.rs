//! Classical and modern cipher transforms used to build syllabus puzzles.
//!
//! All letter ciphers work on uppercase ASCII and pass any other character
//! through unchanged.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherType {
    Scytale,
    Caesar,
    Atbash,
    Polybius,
    Vigenere,
    RailFence,
    Affine,
    /// Caesar shift, then Base64 over the bytes.
    Base64Caesar,
    /// Pick the candidate whose SHA-256 digest starts with the given prefix.
    Sha256Preimage,
}

impl CipherType {
    pub fn label(self) -> &'static str {
        match self {
            CipherType::Scytale => "Spartan Scytale",
            CipherType::Caesar => "Caesar Cipher",
            CipherType::Atbash => "Atbash Cipher",
            CipherType::Polybius => "Polybius Square",
            CipherType::Vigenere => "Vigenère Cipher",
            CipherType::RailFence => "Rail Fence",
            CipherType::Affine => "Affine Cipher",
            CipherType::Base64Caesar => "Telegraph Layers",
            CipherType::Sha256Preimage => "Hash Preimage",
        }
    }
}

impl std::fmt::Display for CipherType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn shift_letter(c: char, shift: u32) -> char {
    if c.is_ascii_uppercase() {
        let offset = (c as u8 - b'A') as u32;
        (b'A' + ((offset + shift) % 26) as u8) as char
    } else {
        c
    }
}

pub fn caesar(text: &str, shift: u32) -> String {
    text.to_uppercase().chars().map(|c| shift_letter(c, shift % 26)).collect()
}

pub fn atbash(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                (b'Z' - (c as u8 - b'A')) as char
            } else {
                c
            }
        })
        .collect()
}

/// Write the text in rows `width` letters wide around the rod, then read it
/// off column by column.
pub fn scytale(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.to_uppercase().chars().collect();
    if width <= 1 {
        return chars.into_iter().collect();
    }
    let mut out = String::with_capacity(chars.len());
    for col in 0..width {
        let mut i = col;
        while i < chars.len() {
            out.push(chars[i]);
            i += width;
        }
    }
    out
}

/// 5x5 square with I and J sharing a cell; letters become row/column digit
/// pairs separated by spaces.
pub fn polybius(text: &str) -> String {
    const SQUARE: &str = "ABCDEFGHIKLMNOPQRSTUVWXYZ";
    text.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .map(|c| {
            let c = if c == 'J' { 'I' } else { c };
            let pos = SQUARE.find(c).unwrap_or(0);
            format!("{}{}", pos / 5 + 1, pos % 5 + 1)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn vigenere(text: &str, key: &str) -> String {
    let shifts: Vec<u32> = key
        .to_uppercase()
        .bytes()
        .filter(u8::is_ascii_uppercase)
        .map(|b| (b - b'A') as u32)
        .collect();
    if shifts.is_empty() {
        return text.to_uppercase();
    }
    let mut k = 0;
    text.to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                let out = shift_letter(c, shifts[k % shifts.len()]);
                k += 1;
                out
            } else {
                c
            }
        })
        .collect()
}

pub fn rail_fence(text: &str, rails: usize) -> String {
    let chars: Vec<char> = text.to_uppercase().chars().collect();
    if rails <= 1 || rails >= chars.len() {
        return chars.into_iter().collect();
    }
    let mut rows = vec![String::new(); rails];
    let mut row = 0usize;
    let mut down = true;
    for c in chars {
        rows[row].push(c);
        if row == 0 {
            down = true;
        } else if row == rails - 1 {
            down = false;
        }
        if down {
            row += 1;
        } else {
            row -= 1;
        }
    }
    rows.concat()
}

/// `E(x) = (a*x + b) mod 26`; `a` must be coprime with 26 for the result to
/// be decipherable.
pub fn affine(text: &str, a: u32, b: u32) -> String {
    text.to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                let x = (c as u8 - b'A') as u32;
                (b'A' + ((a * x + b) % 26) as u8) as char
            } else {
                c
            }
        })
        .collect()
}

pub fn base64_caesar(text: &str, shift: u32) -> String {
    base64::engine::general_purpose::STANDARD.encode(caesar(text, shift))
}

/// Lowercase hex SHA-256 digest of the uppercase text.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.to_uppercase().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caesar_shifts_and_wraps() {
        assert_eq!(caesar("hello", 3), "KHOOR");
        assert_eq!(caesar("XYZ", 3), "ABC");
        assert_eq!(caesar("A B", 27), "B C");
    }

    #[test]
    fn atbash_mirrors_alphabet() {
        assert_eq!(atbash("ABC xyz"), "ZYX CBA");
    }

    #[test]
    fn scytale_reads_columns() {
        assert_eq!(scytale("ABCDEF", 2), "ACEBDF");
        assert_eq!(scytale("ABCDEFG", 3), "ADGBECF");
    }

    #[test]
    fn polybius_merges_i_and_j() {
        assert_eq!(polybius("HI"), "23 24");
        assert_eq!(polybius("J"), "24");
    }

    #[test]
    fn vigenere_matches_textbook_example() {
        assert_eq!(vigenere("ATTACKATDAWN", "LEMON"), "LXFOPVEFRNHR");
    }

    #[test]
    fn rail_fence_matches_textbook_example() {
        assert_eq!(
            rail_fence("WEAREDISCOVEREDFLEEATONCE", 3),
            "WECRLTEERDSOEEFEAOCAIVDEN"
        );
    }

    #[test]
    fn affine_matches_textbook_example() {
        assert_eq!(affine("AFFINE", 5, 8), "IHHWVC");
    }

    #[test]
    fn base64_layer_wraps_caesar_output() {
        assert_eq!(base64_caesar("ABC", 1), "QkNE");
    }

    #[test]
    fn sha256_digest_is_hex() {
        assert_eq!(
            sha256_hex("abc"),
            hex::encode(Sha256::digest(b"ABC"))
        );
        assert_eq!(sha256_hex("abc").len(), 64);
    }
}
