// Copyright 2025 Oxide Computer Company
/*!
 * Example use of Restive: a handler type exposed as a resource, exercised with
 * a handful of requests.
 */

use restive::resource;
use restive::Config;
use restive::ConfigLogging;
use restive::ConfigLoggingLevel;
use restive::HandlerError;
use restive::HandlerTable;
use restive::Server;
use serde::Serialize;

const CONFIG: &str = r##"
    [server]
    base_url = "/api"
    host = "localhost:8080"

    [resources.members]
    class = "Members"
    maxAge = 60

    [resources.roster]
    class = "Members"
    httpMethod = "POST"
"##;

fn main() -> Result<(), String> {
    /*
     * For simplicity, we'll configure an "info"-level logger that writes to
     * stderr assuming that it's a terminal.
     */
    let config_logging = ConfigLogging::StderrTerminal {
        level: ConfigLoggingLevel::Info,
    };
    let log = config_logging
        .to_logger("example-members")
        .map_err(|error| format!("failed to create logger: {}", error))?;

    let config = Config::from_toml(CONFIG).map_err(|e| e.to_string())?;
    let mut handlers = HandlerTable::new();
    handlers.register::<Members>("Members")?;
    let server = Server::new(&config, &handlers, &log)
        .map_err(|error| format!("failed to create server: {}", error))?;

    /*
     * There's no transport here: each request is handed straight to the
     * server and the response printed.
     */
    let requests = [
        get("/api/")?,
        get("/api/members/getplanets")?,
        get("/api/members/getfromplanet.txt?planet=Betelgeuse")?,
        get("/api/members/getbyname.xml?name=Marvin")?,
        get("/api/members/getbyname?name=Slartibartfast&jsonp=show")?,
        http::Request::post("/api/roster/add")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(bytes::Bytes::from_static(b"name=Zaphod&planet=Betelgeuse"))
            .map_err(|e| e.to_string())?,
    ];

    for request in &requests {
        let response = server.handle(request);
        println!("{} {} -> {}", request.method(), request.uri(), response.status());
        for (name, value) in response.headers() {
            println!("    {}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!("{}\n", String::from_utf8_lossy(response.body()));
    }

    Ok(())
}

fn get(uri: &str) -> Result<http::Request<bytes::Bytes>, String> {
    http::Request::get(uri)
        .header("host", "localhost:8080")
        .body(bytes::Bytes::new())
        .map_err(|e| e.to_string())
}

#[derive(Clone, Serialize)]
struct Member {
    name: String,
    planet: String,
}

fn member(name: &str, planet: &str) -> Member {
    Member { name: name.to_string(), planet: planet.to_string() }
}

struct Members {
    members: Vec<Member>,
}

/// The crew of the Heart of Gold.
#[resource]
impl Members {
    pub fn new() -> Self {
        Members {
            members: vec![
                member("Arthur Dent", "Earth"),
                member("Ford Prefect", "Betelgeuse"),
                member("Marvin", "Sirius Tau"),
                member("Trillian", "Earth"),
            ],
        }
    }

    /// Get the planets the crew comes from.
    /// @return array Planet names
    #[restive(rename = "getPlanets")]
    pub fn get_planets(&self) -> Vec<String> {
        let mut planets: Vec<String> =
            self.members.iter().map(|m| m.planet.clone()).collect();
        planets.sort();
        planets.dedup();
        planets
    }

    /// Get the members from a planet.
    /// @param string $planet The planet name
    #[restive(rename = "getFromPlanet")]
    pub fn get_from_planet(
        &self,
        #[restive(default = "Earth")] planet: String,
    ) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.planet == planet)
            .map(|m| m.name.clone())
            .collect()
    }

    /// Look up one member.
    #[restive(rename = "getByName")]
    pub fn get_by_name(&self, name: String) -> Result<Member, HandlerError> {
        self.members.iter().find(|m| m.name == name).cloned().ok_or_else(
            || HandlerError::not_found(format!("no member named {}", name)),
        )
    }

    /// Add a member to the crew.  Each request gets a fresh instance, so the
    /// addition only lasts for that request.
    pub fn add(&mut self, name: String, planet: String) -> usize {
        self.members.push(Member { name, planet });
        self.members.len()
    }
}
