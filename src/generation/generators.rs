/// Named synthetic-data generators the resolver may call.
///
/// Names follow the conventions of common faker libraries (`email`,
/// `phone_number`, `postcode`, ...) because that is what models ask for.
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::config::GeneratorsConfig;
use crate::errors::{EuporieError, EuporieResult};

pub type GeneratorFn = fn(&mut dyn RngCore) -> EuporieResult<String>;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Aisha", "Wei", "Carlos", "Priya", "Olga", "Kwame", "Sofia", "Liam",
    "Noah", "Emma", "Yuki", "Fatima", "Lucas", "Chloe",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Garcia", "Okafor", "Chen", "Novak", "Patel", "Johnson", "Kowalski", "Silva",
    "Nguyen", "Müller", "Brown", "Haddad", "Tanaka",
];
const STREETS: &[&str] = &[
    "Maple Street", "Oak Avenue", "Cedar Lane", "Elm Road", "Park Boulevard", "Lake Drive",
    "Hillcrest Way", "River Court",
];
const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Fairview", "Madison", "Georgetown", "Clinton", "Ashland",
    "Franklin",
];
const STATES: &[&str] = &[
    "California", "Texas", "New York", "Oregon", "Ohio", "Florida", "Colorado", "Virginia",
];
const COUNTRIES: &[&str] = &[
    "United States", "Canada", "Germany", "India", "Brazil", "Japan", "Kenya", "Australia",
];
const COMPANY_WORDS: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Hooli", "Vandelay",
];
const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Ltd", "and Sons"];
const JOBS: &[&str] = &[
    "Software Engineer", "Nurse", "Accountant", "Teacher", "Designer", "Pharmacist",
    "Electrician", "Product Manager",
];
const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];
const WORDS: &[&str] = &[
    "alpha", "river", "quiet", "orange", "signal", "harbor", "lumen", "cobalt", "meadow",
    "vector", "ember", "canyon", "pixel", "summit", "willow", "atlas",
];

fn pick<'a>(rng: &mut dyn RngCore, items: &'a [&'a str]) -> EuporieResult<&'a str> {
    items
        .choose(rng)
        .copied()
        .ok_or_else(|| EuporieError::Generator("empty word list".into()))
}

fn first_name(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, FIRST_NAMES)?.to_string())
}

fn last_name(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, LAST_NAMES)?.to_string())
}

fn name(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("{} {}", first_name(rng)?, last_name(rng)?))
}

fn user_name(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!(
        "{}.{}{}",
        first_name(rng)?.to_lowercase(),
        ascii_fold(&last_name(rng)?.to_lowercase()),
        rng.gen_range(1..100)
    ))
}

fn email(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("{}@{}", user_name(rng)?, pick(rng, DOMAINS)?))
}

fn phone_number(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!(
        "+1-{}-{:03}-{:04}",
        rng.gen_range(201..990),
        rng.gen_range(200..1000),
        rng.gen_range(0..10000)
    ))
}

fn street_address(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("{} {}", rng.gen_range(1..9999), pick(rng, STREETS)?))
}

fn city(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, CITIES)?.to_string())
}

fn state(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, STATES)?.to_string())
}

fn country(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, COUNTRIES)?.to_string())
}

fn postcode(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("{:05}", rng.gen_range(1000..100000)))
}

fn address(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!(
        "{}, {}, {} {}",
        street_address(rng)?,
        city(rng)?,
        state(rng)?,
        postcode(rng)?
    ))
}

fn company(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("{} {}", pick(rng, COMPANY_WORDS)?, pick(rng, COMPANY_SUFFIXES)?))
}

fn job(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, JOBS)?.to_string())
}

fn password(rng: &mut dyn RngCore) -> EuporieResult<String> {
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"23456789";
    const SYMBOLS: &[u8] = b"!@#$%&*?";
    let mut chars: Vec<u8> = Vec::with_capacity(12);
    for set in [UPPER, DIGITS, SYMBOLS] {
        chars.push(set[rng.gen_range(0..set.len())]);
    }
    while chars.len() < 12 {
        chars.push(LOWER[rng.gen_range(0..LOWER.len())]);
    }
    chars.shuffle(rng);
    String::from_utf8(chars).map_err(|e| EuporieError::Generator(e.to_string()))
}

fn date_between(rng: &mut dyn RngCore, from_year: i32, to_year: i32) -> EuporieResult<String> {
    let year = rng.gen_range(from_year..=to_year);
    let month = rng.gen_range(1..=12);
    let day = rng.gen_range(1..=28);
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| EuporieError::Generator(format!("invalid date {year}-{month}-{day}")))
}

fn date(rng: &mut dyn RngCore) -> EuporieResult<String> {
    date_between(rng, 2000, 2030)
}

fn date_of_birth(rng: &mut dyn RngCore) -> EuporieResult<String> {
    date_between(rng, 1950, 2005)
}

fn url(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(format!("https://www.{}.{}", pick(rng, WORDS)?, pick(rng, &["com", "org", "io"])?))
}

fn word(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(pick(rng, WORDS)?.to_string())
}

fn sentence(rng: &mut dyn RngCore) -> EuporieResult<String> {
    let count = rng.gen_range(4..9);
    let mut words = Vec::with_capacity(count);
    for _ in 0..count {
        words.push(word(rng)?);
    }
    let mut text = words.join(" ");
    if let Some(first) = text.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    text.push('.');
    Ok(text)
}

fn text(rng: &mut dyn RngCore) -> EuporieResult<String> {
    let count = rng.gen_range(2..4);
    let mut sentences = Vec::with_capacity(count);
    for _ in 0..count {
        sentences.push(sentence(rng)?);
    }
    Ok(sentences.join(" "))
}

fn random_int(rng: &mut dyn RngCore) -> EuporieResult<String> {
    Ok(rng.gen_range(0..10000).to_string())
}

/// 16-digit number that passes the Luhn check.
fn credit_card_number(rng: &mut dyn RngCore) -> EuporieResult<String> {
    let mut digits: Vec<u32> = vec![4];
    while digits.len() < 15 {
        digits.push(rng.gen_range(0..10));
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    digits.push((10 - sum % 10) % 10);
    Ok(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect())
}

fn ascii_fold(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

const BUILTIN: &[(&str, GeneratorFn)] = &[
    ("address", address),
    ("city", city),
    ("company", company),
    ("country", country),
    ("credit_card_number", credit_card_number),
    ("date", date),
    ("date_of_birth", date_of_birth),
    ("email", email),
    ("first_name", first_name),
    ("job", job),
    ("last_name", last_name),
    ("name", name),
    ("password", password),
    ("phone_number", phone_number),
    ("postcode", postcode),
    ("random_int", random_int),
    ("sentence", sentence),
    ("state", state),
    ("street_address", street_address),
    ("text", text),
    ("url", url),
    ("user_name", user_name),
    ("word", word),
    ("zipcode", postcode),
];

/// Lower-cases and strips call syntax: `"faker.Email()"` → `"email"`.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let bare = lowered
        .strip_prefix("faker.")
        .or_else(|| lowered.strip_prefix("fake."))
        .unwrap_or(&lowered);
    bare.trim_end_matches("()").trim().to_string()
}

/// The allow-list of generators, keyed by normalized name.
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, GeneratorFn>,
}

impl GeneratorRegistry {
    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Every built-in generator.
    pub fn builtin() -> Self {
        Self {
            generators: BUILTIN
                .iter()
                .map(|(name, f)| (name.to_string(), *f))
                .collect(),
        }
    }

    /// Built-in generators limited to `allowed`. Unknown names are ignored.
    pub fn restricted_to<S: AsRef<str>>(allowed: &[S]) -> Self {
        let all = Self::builtin();
        let mut generators = BTreeMap::new();
        for raw in allowed {
            let key = normalize_name(raw.as_ref());
            match all.generators.get(&key) {
                Some(f) => {
                    generators.insert(key, *f);
                }
                None => tracing::warn!(generator = %raw.as_ref(), "unknown generator in allow-list"),
            }
        }
        Self { generators }
    }

    /// An empty `allowed` list enables every built-in generator.
    pub fn from_config(config: &GeneratorsConfig) -> Self {
        if config.allowed.is_empty() {
            Self::builtin()
        } else {
            Self::restricted_to(&config.allowed)
        }
    }

    /// Add or replace a generator.
    pub fn with(mut self, name: &str, f: GeneratorFn) -> Self {
        self.generators.insert(normalize_name(name), f);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// `None` when `name` is not allow-listed.
    pub fn generate(&self, name: &str) -> Option<EuporieResult<String>> {
        let f = self.generators.get(&normalize_name(name))?;
        Some(f(&mut rand::thread_rng()))
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.names())
            .finish()
    }
}
