use crate::restriction_enzyme::RestrictionEnzyme;
use anyhow::{Result, anyhow};
use std::{collections::BTreeMap, fs};

/// Environment variable naming a JSON file that replaces the built-in list.
pub const ENZYMES_ENV_PATH: &str = "PRIMERKIT_ENZYMES";
const BUILTIN_ENZYMES_JSON: &str = include_str!("../assets/enzymes.json");

/// Immutable restriction enzyme registry keyed by name.
#[derive(Clone, Debug)]
pub struct Enzymes {
    restriction_enzymes: BTreeMap<String, RestrictionEnzyme>,
    max_re_length: usize,
}

/// Outcome of resolving a user selection against the registry. `found`
/// keeps the selection order.
#[derive(Clone, Debug, Default)]
pub struct EnzymeSelection {
    pub found: Vec<RestrictionEnzyme>,
    pub missing: Vec<String>,
}

impl Enzymes {
    pub fn from_json_text(json_text: &str) -> Result<Self> {
        let mut restriction_enzymes = BTreeMap::new();
        let res: serde_json::Value = serde_json::from_str(json_text)?;
        let arr = res
            .as_array()
            .ok_or(anyhow!("Enzymes file is not a JSON array"))?;
        for row in arr {
            match row.get("type").and_then(|t| t.as_str()) {
                Some("restriction") => {}
                // Other enzyme classes share the file format but are not
                // used for digestion.
                Some(_) => continue,
                None => return Err(anyhow!("Missing enzyme type for {row}")),
            }
            let mut re: RestrictionEnzyme = serde_json::from_value(row.clone())
                .map_err(|e| anyhow!("Bad restriction enzyme {row}: {e}"))?;
            re.sequence = re.sequence.to_ascii_uppercase();
            re.validate()?;
            re.check_palindromic();
            if restriction_enzymes.contains_key(&re.name) {
                return Err(anyhow!("Duplicate restriction enzyme '{}'", re.name));
            }
            restriction_enzymes.insert(re.name.clone(), re);
        }
        if restriction_enzymes.is_empty() {
            return Err(anyhow!("Enzymes file contains no restriction enzyme"));
        }
        let max_re_length = restriction_enzymes
            .values()
            .map(|re| re.site_len())
            .max()
            .unwrap_or(0);
        Ok(Self {
            restriction_enzymes,
            max_re_length,
        })
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_text(&text)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json_text(BUILTIN_ENZYMES_JSON)
    }

    pub fn restriction_enzymes(&self) -> impl Iterator<Item = &RestrictionEnzyme> {
        self.restriction_enzymes.values()
    }

    pub fn get(&self, name: &str) -> Option<&RestrictionEnzyme> {
        self.restriction_enzymes.get(name)
    }

    pub fn len(&self) -> usize {
        self.restriction_enzymes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restriction_enzymes.is_empty()
    }

    pub fn max_re_length(&self) -> usize {
        self.max_re_length
    }

    /// Names are matched exactly first, then case-insensitively.
    pub fn resolve(&self, names: &[String]) -> EnzymeSelection {
        let mut ret = EnzymeSelection::default();
        for name in names {
            let name = name.trim();
            let hit = self.get(name).or_else(|| {
                self.restriction_enzymes
                    .values()
                    .find(|re| re.name.eq_ignore_ascii_case(name))
            });
            match hit {
                Some(re) if !ret.found.iter().any(|f| f.name == re.name) => {
                    ret.found.push(re.clone())
                }
                Some(_) => {}
                None => ret.missing.push(name.to_string()),
            }
        }
        ret
    }
}

impl Default for Enzymes {
    fn default() -> Self {
        if let Ok(path) = std::env::var(ENZYMES_ENV_PATH) {
            match Self::from_path(&path) {
                Ok(custom) => return custom,
                Err(e) => log::warn!("Ignoring enzyme list '{path}': {e}"),
            }
        }
        // The embedded list is validated by the tests below.
        Self::builtin().unwrap_or_else(|e| panic!("Built-in enzyme list is invalid: {e}"))
    }
}
