//! The built-in 91-week syllabus.
//!
//! Puzzles are generated deterministically: each slot seeds its own PRNG from
//! its ordinal, so the same build always yields the same ciphertexts and
//! answers.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use super::cipher::{self, CipherType};
use super::era::Era;
use super::slot::{normalize_answer, Puzzle, Slot, SlotKey, SlotKind, TOTAL_WEEKS};

const SEED_SALT: u64 = 0x00C1_9E4A_CADE_3000;

const WORD_BANK: &[&str] = &[
    "LEGION", "SPARTA", "ORACLE", "CODEX", "SIGNAL", "CITADEL", "LANTERN", "COURIER",
    "SENTINEL", "MERIDIAN", "KEYSTONE", "PHALANX", "SCRIBE", "PAPYRUS", "TRIREME",
    "CATHEDRAL", "ALCHEMY", "CARTOGRAPH", "ASTROLABE", "CHANCERY", "MONARCH", "TELEGRAPH",
    "ROTOR", "PURPLE", "COLOSSUS", "BLETCHLEY", "WIRELESS", "DISPATCH", "CONVOY",
    "MAINFRAME", "SATELLITE", "SUBMARINE", "PRIMES", "EXPONENT", "MODULUS", "HANDSHAKE",
    "ENTROPY", "LATTICE", "QUANTUM", "LEDGER", "NONCE", "PHOTON", "CIRCUIT", "ENIGMA",
];

const KEY_BANK: &[&str] = &["LEMON", "CROWN", "ALBERTI", "BELLASO", "MEDICI", "VENICE", "CIPHER"];

const AFFINE_MULTIPLIERS: &[u32] = &[3, 5, 7, 9, 11, 15, 17, 19, 21, 23, 25];

fn era(
    id: &str,
    title: &str,
    ordinal: u32,
    weeks: (u32, u32),
    difficulty: (u8, u8),
    timespan: &str,
    description: &str,
) -> Era {
    Era {
        id: id.to_string(),
        title: title.to_string(),
        ordinal,
        first_week: weeks.0,
        last_week: weeks.1,
        min_difficulty: difficulty.0,
        max_difficulty: difficulty.1,
        timespan: timespan.to_string(),
        description: description.trim().to_string(),
    }
}

/// The five historical eras, in order.
pub fn builtin_eras() -> Vec<Era> {
    vec![
        era(
            "ancient",
            "Ancient Foundations",
            1,
            (1, 12),
            (1, 6),
            "3000 BCE - 500 CE",
            indoc::indoc! {"
                Master the cryptographic techniques that built civilizations:
                the Spartan scytale, Caesar's shift, Atbash and the Polybius square.
            "},
        ),
        era(
            "renaissance",
            "Renaissance Revolution",
            2,
            (13, 30),
            (7, 10),
            "1400 - 1700 CE",
            indoc::indoc! {"
                The golden age of polyalphabetic ciphers and the diplomatic
                correspondence they protected.
            "},
        ),
        era(
            "industrial",
            "Industrial Innovation",
            3,
            (31, 60),
            (11, 15),
            "1800 - 1945 CE",
            indoc::indoc! {"
                Telegraph codes, rotor machines and the codebreaking efforts
                that mechanized secret communication.
            "},
        ),
        era(
            "modern",
            "Modern Warfare",
            4,
            (61, 80),
            (16, 18),
            "1945 - 1990 CE",
            indoc::indoc! {"
                The computer age: standardized block ciphers, public keys and
                the mathematics behind them.
            "},
        ),
        era(
            "digital",
            "Digital Future",
            5,
            (81, 91),
            (19, 20),
            "1990 - Present",
            indoc::indoc! {"
                Hash functions, elliptic curves and the quantum frontier.
            "},
        ),
    ]
}

fn era_ciphers(ordinal: u32) -> &'static [CipherType] {
    match ordinal {
        1 => &[
            CipherType::Scytale,
            CipherType::Caesar,
            CipherType::Atbash,
            CipherType::Polybius,
        ],
        2 => &[CipherType::Vigenere, CipherType::RailFence],
        3 => &[CipherType::Affine, CipherType::Base64Caesar, CipherType::Vigenere],
        4 => &[CipherType::Affine, CipherType::Base64Caesar],
        _ => &[CipherType::Sha256Preimage, CipherType::Base64Caesar],
    }
}

/// Transpositions can leave short words with repeated letters unchanged; try
/// successive parameters from `start` down to 2 until the text moves.
fn scrambled(answer: &str, start: usize, transpose: impl Fn(usize) -> String) -> (usize, String) {
    let start = start.min(answer.len().saturating_sub(1)).max(2);
    (2..=start)
        .rev()
        .map(|p| (p, transpose(p)))
        .find(|(_, text)| text != answer)
        .unwrap_or_else(|| (start, cipher::atbash(answer)))
}

fn build_puzzle(key: SlotKey, cipher_type: CipherType, rng: &mut Mcg128Xsl64) -> Puzzle {
    let answer = *WORD_BANK.choose(rng).unwrap_or(&"CIPHER");
    let heading = format!("Week {} {}", key.week, key.kind.day_name());

    let (prompt, hint) = match cipher_type {
        CipherType::Scytale => {
            let start = rng.gen_range(2..=4);
            let (width, text) = scrambled(answer, start, |w| cipher::scytale(answer, w));
            (
                format!("A leather strip unwound from a rod reads: {text}"),
                format!("Wrap it around a rod {width} letters wide."),
            )
        }
        CipherType::Caesar => {
            let shift = rng.gen_range(1..=25);
            (
                format!("A legionary's tablet reads: {}", cipher::caesar(answer, shift)),
                "Every letter moved the same distance along the alphabet.".to_string(),
            )
        }
        CipherType::Atbash => (
            format!("A scribe's marginal note reads: {}", cipher::atbash(answer)),
            "The first letter stands for the last.".to_string(),
        ),
        CipherType::Polybius => (
            format!("Torches on the wall signal: {}", cipher::polybius(answer)),
            "Row then column in a five-by-five square; I and J share a cell.".to_string(),
        ),
        CipherType::Vigenere => {
            let keyword = *KEY_BANK.choose(rng).unwrap_or(&"LEMON");
            (
                format!("An intercepted dispatch reads: {}", cipher::vigenere(answer, keyword)),
                format!("The keyword has {} letters.", keyword.len()),
            )
        }
        CipherType::RailFence => {
            let start = rng.gen_range(2..=4);
            let (rails, text) = scrambled(answer, start, |r| cipher::rail_fence(answer, r));
            (
                format!("A zig-zag courier note reads: {text}"),
                format!("Lay it out across {rails} rails."),
            )
        }
        CipherType::Affine => {
            let a = *AFFINE_MULTIPLIERS.choose(rng).unwrap_or(&5);
            let b = rng.gen_range(1..=25);
            (
                format!("A machine tape prints: {}", cipher::affine(answer, a, b)),
                format!("E(x) = {a}x + b mod 26."),
            )
        }
        CipherType::Base64Caesar => {
            let shift = rng.gen_range(1..=25);
            (
                format!("A telegraph operator relays: {}", cipher::base64_caesar(answer, shift)),
                "Peel the transport encoding before the shift.".to_string(),
            )
        }
        CipherType::Sha256Preimage => {
            let mut candidates: Vec<&str> = WORD_BANK
                .choose_multiple(rng, 6)
                .copied()
                .filter(|w| *w != answer)
                .take(4)
                .collect();
            candidates.push(answer);
            candidates.shuffle(rng);
            let digest = cipher::sha256_hex(answer);
            (
                format!(
                    "Which of [{}] has a SHA-256 digest starting {}?",
                    candidates.join(", "),
                    &digest[..16]
                ),
                "Hash the uppercase word.".to_string(),
            )
        }
    };

    Puzzle {
        cipher_type,
        title: format!("{heading}: {}", cipher_type.label()),
        prompt,
        expected_answer: normalize_answer(answer),
        hint,
    }
}

/// Build all 273 slots for the given eras, in global order.
pub fn builtin_slots(eras: &[Era]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity((TOTAL_WEEKS * 3) as usize);
    for week in 1..=TOTAL_WEEKS {
        let Some(era) = eras.iter().find(|e| e.contains_week(week)) else {
            continue;
        };
        let base = era.difficulty_for_week(week);
        for kind in SlotKind::ALL {
            let key = SlotKey::new(week, kind);
            let difficulty_level = match kind {
                SlotKind::Closer => (base + 1).min(era.max_difficulty),
                _ => base,
            };
            let mut rng = Mcg128Xsl64::seed_from_u64(SEED_SALT ^ key.ordinal() as u64);
            let ciphers = era_ciphers(era.ordinal);
            let cipher_type = ciphers[(key.ordinal() as usize) % ciphers.len()];
            slots.push(Slot {
                week,
                kind,
                difficulty_level,
                reward_points: difficulty_level as u32 * 10,
                puzzle: build_puzzle(key, cipher_type, &mut rng),
            });
        }
    }
    slots
}
