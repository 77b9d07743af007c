//! ModSecurity directive emission for a single endpoint.
//!
//! Each endpoint becomes one location block. Inside the block, directives are evaluated top to
//! bottom by ModSecurity, and `skipAfter:<MARKER>` jumps forward to the `SecMarker <MARKER>`
//! emitted later in the same block. Marker names are derived from the id of the rule that jumps
//! to them, so they are unique for as long as the [`RuleIdSequencer`] is shared.
//!
//! Block layout:
//!
//! 1. location header
//! 2. IP restriction (restricted endpoints only)
//! 3. method allow-list
//! 4. rate limit (when enabled)
//! 5. one marker pair per declared method
//! 6. location footer

use crate::config::{Config, WebServer};
use crate::error::Result;
use crate::model::Endpoint;
use crate::path_regex;
use crate::sequencer::RuleIdSequencer;
use log::debug;

/// Method that is always allowed, so that CORS preflight requests reach the application.
const ALWAYS_ALLOWED_METHOD: &str = "OPTIONS";

/// Builds the directive block of each endpoint for one web server dialect.
pub struct RuleEmitter<'a> {
    config: &'a Config,
    web_server: WebServer,
    sequencer: &'a RuleIdSequencer,
}

impl<'a> RuleEmitter<'a> {
    pub fn new(config: &'a Config, web_server: WebServer, sequencer: &'a RuleIdSequencer) -> Self {
        Self {
            config,
            web_server,
            sequencer,
        }
    }

    /// Produces the ordered directives of one endpoint.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint's path template has a placeholder with no declared parameter.
    pub fn emit(&self, endpoint: &Endpoint) -> Result<Vec<String>> {
        let pattern = path_regex::translate(endpoint)?;
        let methods = directive_methods(endpoint);
        debug!(
            "Emitting {} block for {} ({})",
            self.web_server,
            endpoint.path,
            methods.join(",")
        );

        let mut rules = vec![self.location_header(&pattern)];

        if let Some(allowed) = self.config.allowed_ips_for(&endpoint.path) {
            rules.extend(self.ip_restriction(&allowed));
        }

        rules.push(self.method_allow_list(&methods));

        if self.config.rate_limit_enabled() {
            rules.extend(self.rate_limit(&endpoint.path));
        }

        for method in &methods {
            rules.extend(self.method_marker(method));
        }

        rules.push(self.location_footer());
        Ok(rules)
    }

    fn location_header(&self, pattern: &str) -> String {
        match self.web_server {
            WebServer::Apache => format!("<LocationMatch \"^{}$\">", pattern),
            WebServer::Nginx => format!("location {}{{ modsecurity_rules '", pattern),
        }
    }

    fn location_footer(&self) -> String {
        match self.web_server {
            WebServer::Apache => "</LocationMatch>".to_string(),
            WebServer::Nginx => "';}".to_string(),
        }
    }

    /// Denies every client whose address does not match `allowed`.
    fn ip_restriction(&self, allowed: &str) -> Vec<String> {
        let skip_id = self.sequencer.next_id();
        let deny_id = self.sequencer.next_id();
        let marker = format!("IP_IS_ALLOWED_{}", skip_id);

        vec![
            format!(
                "SecRule REMOTE_ADDR \"@ipMatch {}\" \"id:'{}',skipAfter:{},nolog\"",
                allowed, skip_id, marker
            ),
            format!(
                "SecAction \"deny,id:'{}',log,msg:'IP not allowed on this endpoint',logdata:%{{MATCHED_VAR}}\"",
                deny_id
            ),
            format!("SecMarker {}", marker),
        ]
    }

    fn method_allow_list(&self, methods: &[String]) -> String {
        let mut allowed: Vec<&str> = methods.iter().map(String::as_str).collect();
        if !allowed.contains(&ALWAYS_ALLOWED_METHOD) {
            allowed.push(ALWAYS_ALLOWED_METHOD);
        }

        format!(
            "SecRule REQUEST_METHOD \"!^(?:{})$\" \"phase:2,t:none,deny,id:'{}',status:405,msg:'Unauthorize method',logdata:%{{REQUEST_METHOD}},setenv:METHODERROR\"",
            allowed.join("|"),
            self.sequencer.next_id()
        )
    }

    /// Per-client request counter, keyed by address and user agent, with whitelisted
    /// addresses jumping over the whole block.
    ///
    /// The counter name ends with the block's first rule id, so templates that normalize to
    /// the same key still count separately.
    fn rate_limit(&self, path: &str) -> Vec<String> {
        let skip_id = self.sequencer.next_id();
        let marker = format!("IGNORE_RATELIMIT_{}", skip_id);
        let counter = format!("ratelimit_{}_{}", counter_key(path), skip_id);
        let threshold = self.config.ratelimit;

        vec![
            format!(
                "SecRule REMOTE_ADDR \"@ipMatch {}\" \"id:'{}',skipAfter:{},nolog\"",
                self.config.ratelimit_whitelist.trim(),
                skip_id,
                marker
            ),
            format!(
                "SecAction \"phase:2,id:'{}',nolog,pass,initcol:ip=%{{REMOTE_ADDR}}_%{{REQUEST_HEADERS.User-Agent}}\"",
                self.sequencer.next_id()
            ),
            format!(
                "SecAction \"phase:2,id:'{}',nolog,pass,deprecatevar:ip.{}={}/{}\"",
                self.sequencer.next_id(),
                counter,
                threshold,
                self.config.ratelimit_window
            ),
            format!(
                "SecAction \"phase:2,id:'{}',nolog,pass,setvar:ip.{}=+1\"",
                self.sequencer.next_id(),
                counter
            ),
            format!(
                "SecRule IP:{} \"@gt {}\" \"phase:2,t:none,deny,id:'{}',status:400,log,msg:'Rate limit exceeded',logdata:%{{MATCHED_VAR}}\"",
                counter,
                threshold,
                self.sequencer.next_id()
            ),
            format!("SecMarker {}", marker),
        ]
    }

    /// Attachment point for rules specific to one method of the endpoint.
    fn method_marker(&self, method: &str) -> Vec<String> {
        let id = self.sequencer.next_id();
        vec![
            format!(
                "SecRule REQUEST_METHOD \"!^(?:{})$\" \"skipAfter:FILTER_BY_METHOD_{},nolog,id:'{}'\"",
                method, id, id
            ),
            format!("SecMarker FILTER_BY_METHOD_{}", id),
        ]
    }
}

/// Upper-cased method names, without duplicates, in declaration order.
fn directive_methods(endpoint: &Endpoint) -> Vec<String> {
    let mut methods: Vec<String> = Vec::with_capacity(endpoint.methods.len());
    for method in &endpoint.methods {
        let name = method.directive_name();
        if !methods.contains(&name) {
            methods.push(name);
        }
    }
    methods
}

/// Collection variable suffix for an endpoint: `/users/{id}` becomes `users_id`.
fn counter_key(path: &str) -> String {
    let mut key = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c);
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    let key = key.trim_end_matches('_');
    if key.is_empty() {
        "root".to_string()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestrictedEndpoint;
    use crate::model::{Method, ParamType, Parameter};
    use pretty_assertions::assert_eq;

    fn users_endpoint() -> Endpoint {
        let mut get = Method::new("get");
        get.parameters
            .push(Parameter::new("id", "path", ParamType::Integer, true));
        Endpoint {
            path: "/users/{id}".to_string(),
            methods: vec![get],
        }
    }

    fn emit(config: &Config, web_server: WebServer, endpoint: &Endpoint) -> Vec<String> {
        let sequencer = RuleIdSequencer::new();
        RuleEmitter::new(config, web_server, &sequencer)
            .emit(endpoint)
            .unwrap()
    }

    #[test]
    fn test_basic_apache_block() {
        let rules = emit(&Config::default(), WebServer::Apache, &users_endpoint());

        assert_eq!(
            rules,
            vec![
                r#"<LocationMatch "^/users/([+-]?[0-9]*)$">"#.to_string(),
                r#"SecRule REQUEST_METHOD "!^(?:GET|OPTIONS)$" "phase:2,t:none,deny,id:'30001',status:405,msg:'Unauthorize method',logdata:%{REQUEST_METHOD},setenv:METHODERROR""#.to_string(),
                r#"SecRule REQUEST_METHOD "!^(?:GET)$" "skipAfter:FILTER_BY_METHOD_30002,nolog,id:'30002'""#.to_string(),
                "SecMarker FILTER_BY_METHOD_30002".to_string(),
                "</LocationMatch>".to_string(),
            ]
        );
    }

    #[test]
    fn test_nginx_wrapper() {
        let rules = emit(&Config::default(), WebServer::Nginx, &users_endpoint());
        assert_eq!(rules.first().unwrap(), "location /users/([+-]?[0-9]*){ modsecurity_rules '");
        assert_eq!(rules.last().unwrap(), "';}");
    }

    #[test]
    fn test_dialects_share_directives() {
        let config = Config {
            ratelimit: 10,
            ratelimit_whitelist: "10.0.0.0/8".to_string(),
            restricted_endpoints: vec![RestrictedEndpoint {
                path: "/users/{id}".to_string(),
                ip_allowed: "127.0.0.1".to_string(),
            }],
            ..Config::default()
        };

        let apache = emit(&config, WebServer::Apache, &users_endpoint());
        let nginx = emit(&config, WebServer::Nginx, &users_endpoint());

        assert_eq!(apache.len(), nginx.len());
        assert_eq!(&apache[1..apache.len() - 1], &nginx[1..nginx.len() - 1]);
        assert_ne!(apache[0], nginx[0]);
        assert_ne!(apache.last(), nginx.last());
    }

    #[test]
    fn test_ip_restriction_block() {
        let config = Config {
            restricted_endpoints: vec![RestrictedEndpoint {
                path: "/users/{id}".to_string(),
                ip_allowed: "192.168.0.0/24".to_string(),
            }],
            ..Config::default()
        };

        let rules = emit(&config, WebServer::Apache, &users_endpoint());

        assert_eq!(
            &rules[1..4],
            &[
                r#"SecRule REMOTE_ADDR "@ipMatch 192.168.0.0/24" "id:'30001',skipAfter:IP_IS_ALLOWED_30001,nolog""#.to_string(),
                r#"SecAction "deny,id:'30002',log,msg:'IP not allowed on this endpoint',logdata:%{MATCHED_VAR}""#.to_string(),
                "SecMarker IP_IS_ALLOWED_30001".to_string(),
            ]
        );
        assert!(rules[4].contains("id:'30003'"));
    }

    #[test]
    fn test_restriction_matches_literal_path_only() {
        let config = Config {
            restricted_endpoints: vec![RestrictedEndpoint {
                path: "/users".to_string(),
                ip_allowed: "127.0.0.1".to_string(),
            }],
            ..Config::default()
        };

        let rules = emit(&config, WebServer::Apache, &users_endpoint());
        assert!(rules.iter().all(|r| !r.contains("@ipMatch")));
    }

    #[test]
    fn test_rate_limit_block() {
        let config = Config {
            ratelimit: 50,
            ratelimit_whitelist: "10.1.1.1".to_string(),
            ..Config::default()
        };

        let rules = emit(&config, WebServer::Apache, &users_endpoint());

        assert_eq!(
            &rules[2..8],
            &[
                r#"SecRule REMOTE_ADDR "@ipMatch 10.1.1.1" "id:'30002',skipAfter:IGNORE_RATELIMIT_30002,nolog""#.to_string(),
                r#"SecAction "phase:2,id:'30003',nolog,pass,initcol:ip=%{REMOTE_ADDR}_%{REQUEST_HEADERS.User-Agent}""#.to_string(),
                r#"SecAction "phase:2,id:'30004',nolog,pass,deprecatevar:ip.ratelimit_users_id_30002=50/60""#.to_string(),
                r#"SecAction "phase:2,id:'30005',nolog,pass,setvar:ip.ratelimit_users_id_30002=+1""#.to_string(),
                r#"SecRule IP:ratelimit_users_id_30002 "@gt 50" "phase:2,t:none,deny,id:'30006',status:400,log,msg:'Rate limit exceeded',logdata:%{MATCHED_VAR}""#.to_string(),
                "SecMarker IGNORE_RATELIMIT_30002".to_string(),
            ]
        );
    }

    #[test]
    fn test_rate_limit_disabled_with_zero_threshold() {
        let config = Config {
            ratelimit: 0,
            ratelimit_whitelist: "10.1.1.1".to_string(),
            ..Config::default()
        };

        let rules = emit(&config, WebServer::Apache, &users_endpoint());
        assert!(rules.iter().all(|r| !r.contains("IGNORE_RATELIMIT")));
    }

    #[test]
    fn test_methods_are_uppercased_and_deduplicated() {
        let endpoint = Endpoint {
            path: "/items".to_string(),
            methods: vec![
                Method::new("get"),
                Method::new("Post"),
                Method::new("GET"),
                Method::new("options"),
            ],
        };

        let rules = emit(&Config::default(), WebServer::Apache, &endpoint);

        assert!(rules[1].starts_with(r#"SecRule REQUEST_METHOD "!^(?:GET|POST|OPTIONS)$""#));
        let markers: Vec<_> = rules
            .iter()
            .filter(|r| r.starts_with("SecMarker FILTER_BY_METHOD_"))
            .collect();
        assert_eq!(markers.len(), 3);
    }

    #[test]
    fn test_endpoint_without_methods_only_allows_options() {
        let rules = emit(&Config::default(), WebServer::Apache, &Endpoint::new("/ping"));
        assert_eq!(rules.len(), 3);
        assert!(rules[1].contains(r#""!^(?:OPTIONS)$""#));
    }

    #[test]
    fn test_unresolvable_placeholder_propagates() {
        let endpoint = Endpoint {
            path: "/users/{name}".to_string(),
            methods: vec![Method::new("get")],
        };
        let sequencer = RuleIdSequencer::new();
        let result = RuleEmitter::new(&Config::default(), WebServer::Apache, &sequencer).emit(&endpoint);
        assert!(result.is_err());
    }

    #[test]
    fn test_counter_key() {
        assert_eq!(counter_key("/users/{id}"), "users_id");
        assert_eq!(counter_key("/a//b.json"), "a_b_json");
        assert_eq!(counter_key("/"), "root");
        assert_eq!(counter_key("/{x}/"), "x");
    }

    #[test]
    fn test_similar_paths_get_distinct_counters() {
        let config = Config {
            ratelimit: 5,
            ratelimit_whitelist: "10.0.0.1".to_string(),
            ..Config::default()
        };
        let sequencer = RuleIdSequencer::new();
        let emitter = RuleEmitter::new(&config, WebServer::Apache, &sequencer);

        let counters: Vec<String> = ["/a_b", "/a/b", "/a.b"]
            .into_iter()
            .map(|path| {
                let rules = emitter.emit(&Endpoint::new(path)).unwrap();
                rules
                    .iter()
                    .find(|r| r.starts_with("SecRule IP:"))
                    .and_then(|r| r.split_whitespace().nth(1))
                    .map(str::to_string)
                    .unwrap()
            })
            .collect();

        assert_eq!(
            counters,
            vec![
                "IP:ratelimit_a_b_30002",
                "IP:ratelimit_a_b_30008",
                "IP:ratelimit_a_b_30014",
            ]
        );
    }
}
