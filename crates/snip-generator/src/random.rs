use crate::{Generator, DEFAULT_ALIAS_LENGTH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snip_core::{CoreError, ShortCode, MAX_ALIAS_LENGTH, MIN_ALIAS_LENGTH};
use std::fmt;
use std::sync::{Mutex, PoisonError};

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Characters a [`RandomGenerator`] draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alphabet {
    /// ASCII letters, both cases.
    #[default]
    Letters,
    /// ASCII letters and digits.
    Alphanumeric,
}

impl Alphabet {
    pub fn chars(&self) -> &'static [u8] {
        match self {
            Alphabet::Letters => LETTERS,
            Alphabet::Alphanumeric => ALPHANUMERIC,
        }
    }
}

enum Source {
    Thread,
    Seeded(Mutex<StdRng>),
}

/// Generates fixed-length codes with characters drawn uniformly at random.
///
/// Not cryptographically secure. Every output is a valid [`ShortCode`].
pub struct RandomGenerator {
    length: usize,
    alphabet: Alphabet,
    source: Source,
}

impl RandomGenerator {
    /// Creates a generator backed by the thread-local RNG.
    pub fn new(length: usize) -> Result<Self, CoreError> {
        Self::check_length(length)?;
        Ok(Self {
            length,
            alphabet: Alphabet::default(),
            source: Source::Thread,
        })
    }

    /// Creates a generator with a reproducible sequence of codes.
    pub fn seeded(length: usize, seed: u64) -> Result<Self, CoreError> {
        Self::check_length(length)?;
        Ok(Self {
            length,
            alphabet: Alphabet::default(),
            source: Source::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        })
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn check_length(length: usize) -> Result<(), CoreError> {
        if !(MIN_ALIAS_LENGTH..=MAX_ALIAS_LENGTH).contains(&length) {
            return Err(CoreError::InvalidShortCode(format!(
                "generated length must be between {} and {}, got {}",
                MIN_ALIAS_LENGTH, MAX_ALIAS_LENGTH, length
            )));
        }
        Ok(())
    }

    fn sample(&self) -> String {
        let chars = self.alphabet.chars();
        match &self.source {
            Source::Thread => draw(&mut rand::rng(), chars, self.length),
            Source::Seeded(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                draw(&mut *rng, chars, self.length)
            }
        }
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, chars: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())] as char)
        .collect()
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_ALIAS_LENGTH,
            alphabet: Alphabet::default(),
            source: Source::Thread,
        }
    }
}

impl fmt::Debug for RandomGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            Source::Thread => "thread",
            Source::Seeded(_) => "seeded",
        };
        f.debug_struct("RandomGenerator")
            .field("length", &self.length)
            .field("alphabet", &self.alphabet)
            .field("source", &source)
            .finish()
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        ShortCode::new_unchecked(self.sample())
    }
}
