// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stack names and the three-word name generator

use crate::domain::config::app::is_valid_k8s_name;
use crate::shared::error::DeployError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

const ADVERBS: &[&str] = &[
    "ably", "boldly", "briskly", "calmly", "deeply", "eagerly", "evenly", "firmly", "freely",
    "gently", "gladly", "hardly", "highly", "jointly", "kindly", "largely", "lively", "loudly",
    "mainly", "merely", "mostly", "neatly", "nicely", "openly", "partly", "quickly", "rarely",
    "really", "slowly", "smoothly", "solely", "surely", "swiftly", "truly", "vastly", "warmly",
    "wholly", "wildly", "wisely",
];

const ADJECTIVES: &[&str] = &[
    "able", "active", "amazed", "big", "bold", "brave", "bright", "calm", "clean", "clever",
    "cool", "crisp", "eager", "fair", "fancy", "fine", "fit", "fond", "free", "fresh", "glad",
    "golden", "good", "grand", "happy", "hip", "holy", "humble", "keen", "kind", "lucky",
    "merry", "modest", "neat", "noble", "polite", "proud", "quick", "quiet", "rapid", "ready",
    "robust", "safe", "sharp", "smart", "solid", "sunny", "sweet", "tidy", "upward", "vital",
    "warm", "wise",
];

const NAMES: &[&str] = &[
    "ant", "badger", "bass", "bee", "bison", "bobcat", "crane", "cricket", "dingo", "dodo",
    "eagle", "eel", "falcon", "ferret", "finch", "fox", "gecko", "gull", "hare", "hawk",
    "heron", "ibex", "koala", "lark", "lemur", "lion", "lynx", "marlin", "mink", "mole",
    "moose", "newt", "ocelot", "osprey", "otter", "owl", "panda", "pika", "puma", "quail",
    "raven", "seal", "shrew", "sloth", "snipe", "stork", "swan", "tapir", "trout", "viper",
    "walrus", "wombat", "wren", "yak", "zebra",
];

/// A validated stack (environment) name, also used as the Kubernetes resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackName(String);

impl StackName {
    /// Generate a random three-word hyphenated name such as `gently-brave-otter`.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let words = [
            ADVERBS.choose(rng).copied().unwrap_or("quickly"),
            ADJECTIVES.choose(rng).copied().unwrap_or("happy"),
            NAMES.choose(rng).copied().unwrap_or("otter"),
        ];
        Self(words.join("-"))
    }

    /// Use the given name, or generate one when absent.
    pub fn resolve(name: Option<&str>) -> Result<Self, DeployError> {
        match name {
            Some(name) if !name.is_empty() => name.parse(),
            _ => Ok(Self::generate()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StackName {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_k8s_name(s) || s.len() > 63 {
            return Err(DeployError::ValidationError(format!(
                "Invalid stack name '{}': use at most 63 lowercase letters, digits or '-', \
                 starting and ending with a letter or digit",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StackName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_name_has_three_words() {
        for _ in 0..50 {
            let name = StackName::generate();
            let parts: Vec<&str> = name.as_str().split('-').collect();
            assert_eq!(parts.len(), 3, "unexpected name {}", name);
            assert!(name.as_str().parse::<StackName>().is_ok());
        }
    }

    #[test]
    fn test_generation_is_seedable() {
        let a = StackName::generate_with(&mut StdRng::seed_from_u64(7));
        let b = StackName::generate_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_prefers_given_name() {
        let name = StackName::resolve(Some("my-app")).unwrap();
        assert_eq!(name.as_str(), "my-app");

        let generated = StackName::resolve(None).unwrap();
        assert!(!generated.as_str().is_empty());

        let generated = StackName::resolve(Some("")).unwrap();
        assert_eq!(generated.as_str().split('-').count(), 3);
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert!("My_App".parse::<StackName>().is_err());
        assert!("-app".parse::<StackName>().is_err());
        assert!("a".repeat(64).parse::<StackName>().is_err());
    }
}
