// Copyright 2025 Oxide Computer Company

//! Common facilities for automated testing: a crew-manifest handler and the
//! configuration that exposes it.

use restive::resource;
use restive::test_util::TestContext;
use restive::ConfigLogging;
use restive::ConfigLoggingIfExists;
use restive::ConfigLoggingLevel;
use restive::HandlerError;
use restive::HandlerTable;
use serde::Serialize;

/// Configuration shared by most tests: `members` answers GET and is cached
/// for ten minutes, `crew` exposes the same handler over POST.
pub const MEMBERS_CONFIG: &str = r#"
[server]
host = "restive.test"

[resources.members]
class = "Members"
maxAge = 600

[resources.crew]
class = "Members"
httpMethod = "POST"
"#;

/// When the manifest was last changed: Tue, 14 Nov 2023 22:13:20 GMT
pub const MANIFEST_MODIFIED: i64 = 1_700_000_000;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Member {
    pub name: String,
    pub planet: String,
    pub human: bool,
}

fn member(name: &str, planet: &str, human: bool) -> Member {
    Member { name: name.to_string(), planet: planet.to_string(), human }
}

pub struct Members {
    members: Vec<Member>,
}

/// Members of the crew.
///
/// Everyone aboard the Heart of Gold, with their planet of origin.
#[resource]
impl Members {
    pub fn new(
        #[restive(default = "heart-of-gold")] manifest: String,
    ) -> Result<Members, HandlerError> {
        if manifest != "heart-of-gold" {
            return Err(HandlerError::new(format!(
                "unknown manifest \"{}\"",
                manifest
            )));
        }
        Ok(Members {
            members: vec![
                member("Arthur Dent", "Earth", true),
                member("Ford Prefect", "Betelgeuse V", false),
                member("Zaphod Beeblebrox", "Betelgeuse V", false),
                member("Trillian", "Earth", true),
                member("Marvin", "Sirius Tau", false),
            ],
        })
    }

    /// Get the planets the crew comes from.
    /// @return array Planet names, in name order
    #[restive(rename = "getPlanets")]
    pub fn planets(&self) -> Vec<String> {
        let mut planets: Vec<String> =
            self.members.iter().map(|m| m.planet.clone()).collect();
        planets.sort();
        planets.dedup();
        planets
    }

    /// Get the members from a planet.
    /// @param string $planet The planet name
    /// @return array
    #[restive(rename = "getFromPlanet")]
    pub fn from_planet(
        &self,
        #[restive(default = "Earth")] planet: String,
    ) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.planet.eq_ignore_ascii_case(&planet))
            .cloned()
            .collect()
    }

    /// Get the human members.
    #[restive(rename = "getHumans")]
    pub fn humans(&self) -> Vec<Member> {
        self.members.iter().filter(|m| m.human).cloned().collect()
    }

    /// Find a member by name.
    /// @param $name Full name
    #[restive(rename = "getByName")]
    pub fn by_name(&self, name: String) -> Result<Member, HandlerError> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| {
                HandlerError::not_found(format!("no member named {}", name))
            })
    }

    /// Get a member by position in the manifest.
    /// @param int $index Zero-based position
    #[restive(rename = "getNth")]
    pub fn nth(&self, index: usize) -> Result<Member, HandlerError> {
        self.members.get(index).cloned().ok_or_else(|| {
            HandlerError::not_found(format!("no member at {}", index))
        })
    }

    /// Describe the manifest itself.
    #[restive(rename = "getManifest")]
    pub fn manifest(&self) -> serde_json::Value {
        serde_json::json!({
            "lastModified": MANIFEST_MODIFIED,
            "count": self.members.len(),
        })
    }

    /// Count the members, optionally only those from one planet.
    pub fn count(&self, planet: Option<String>) -> usize {
        match planet {
            Some(planet) => self.from_planet(planet).len(),
            None => self.members.len(),
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Always fails.
    pub fn explode(&self) -> Result<Member, HandlerError> {
        let cause =
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad record");
        Err(HandlerError::new("the manifest is corrupt").with_source(cause))
    }

    pub fn __internal(&self) -> usize {
        0
    }
}

pub fn handlers() -> HandlerTable {
    let mut handlers = HandlerTable::new();
    handlers.register::<Members>("Members").unwrap();
    handlers
}

pub fn log_config() -> ConfigLogging {
    ConfigLogging::File {
        level: ConfigLoggingLevel::Debug,
        path: "UNUSED".into(),
        if_exists: ConfigLoggingIfExists::Fail,
    }
}

pub fn test_setup(test_name: &str) -> TestContext {
    test_setup_with_config(test_name, MEMBERS_CONFIG)
}

pub fn test_setup_with_config(test_name: &str, config: &str) -> TestContext {
    TestContext::new(test_name, config, &handlers(), &log_config())
}
