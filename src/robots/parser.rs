//! Robots.txt parser implementation
//!
//! Rules are grouped by user agent. Disallow rules are compiled into one regex
//! per agent when parsing finishes, so checks never rebuild a pattern.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// The wildcard user agent
pub const ANY_AGENT: &str = "*";

/// Rule sets declared for one user agent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRules {
    pub disallow: BTreeSet<String>,
    pub allow: BTreeSet<String>,
    pub sitemaps: BTreeSet<String>,
}

/// Parsed robots.txt policy
///
/// Built once per run and read-only afterwards; it is shared across all
/// crawl tasks behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    agents: BTreeMap<String, AgentRules>,
    /// Disallow matcher per declared agent (that agent's rules plus `*`)
    matchers: BTreeMap<String, Regex>,
}

#[derive(Debug, Clone, Copy)]
enum Directive {
    UserAgent,
    Disallow,
    Allow,
    Sitemap,
}

impl Directive {
    fn parse(line: &str) -> Option<(Self, &str)> {
        let (key, value) = line.split_once(':')?;
        let directive = match key.trim().to_ascii_lowercase().as_str() {
            "user-agent" => Self::UserAgent,
            "disallow" => Self::Disallow,
            "allow" => Self::Allow,
            "sitemap" => Self::Sitemap,
            _ => return None,
        };
        Some((directive, value.trim()))
    }
}

impl RobotsPolicy {
    /// Parses a robots.txt body
    ///
    /// Parsing is tolerant: comments, blank lines and anything that is not a
    /// recognized directive are ignored. `User-agent:` switches the agent that
    /// following rules apply to; rules before any `User-agent:` line apply to
    /// `*`. An empty `Disallow:` restricts nothing and adds no rule.
    ///
    /// # Examples
    ///
    /// ```
    /// use web_fetcher::robots::RobotsPolicy;
    ///
    /// let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private\n");
    /// assert!(policy.is_disallowed("http://x/private/page", "*"));
    /// assert!(!policy.is_disallowed("http://x/public", "*"));
    /// ```
    pub fn parse(body: &str) -> Self {
        let mut agents: BTreeMap<String, AgentRules> = BTreeMap::new();
        let mut current_agent = ANY_AGENT.to_string();

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = Directive::parse(line) else {
                tracing::trace!(line = %line, "Ignoring robots.txt line");
                continue;
            };

            match directive {
                Directive::UserAgent => current_agent = value.to_string(),
                Directive::Disallow => {
                    let rules = agents.entry(current_agent.clone()).or_default();
                    if !value.is_empty() {
                        rules.disallow.insert(value.to_string());
                    }
                }
                Directive::Allow => {
                    agents
                        .entry(current_agent.clone())
                        .or_default()
                        .allow
                        .insert(value.to_string());
                }
                Directive::Sitemap => {
                    agents
                        .entry(current_agent.clone())
                        .or_default()
                        .sitemaps
                        .insert(value.to_string());
                }
            }
        }

        let matchers = agents
            .keys()
            .filter_map(|agent| {
                compile_disallow(&agents, agent).map(|regex| (agent.clone(), regex))
            })
            .collect();

        Self { agents, matchers }
    }

    /// Checks whether a URL is disallowed for the given agent
    ///
    /// The rules for `*` and for `agent` are combined; the URL is disallowed if
    /// any rule matches anywhere in it. Without any rules everything is allowed.
    pub fn is_disallowed(&self, url: &str, agent: &str) -> bool {
        self.matchers
            .get(agent)
            .or_else(|| self.matchers.get(ANY_AGENT))
            .is_some_and(|regex| regex.is_match(url))
    }

    /// Returns the rules declared for exactly this agent
    pub fn rules(&self, agent: &str) -> Option<&AgentRules> {
        self.agents.get(agent)
    }

    /// Returns every sitemap URL declared in the file
    pub fn sitemaps(&self) -> BTreeSet<&str> {
        self.agents
            .values()
            .flat_map(|rules| rules.sitemaps.iter().map(String::as_str))
            .collect()
    }

    /// Returns true if the file declared no disallow rules at all
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Builds one alternation regex from the disallow rules of `*` and `agent`
fn compile_disallow(agents: &BTreeMap<String, AgentRules>, agent: &str) -> Option<Regex> {
    let mut rules: BTreeSet<&str> = BTreeSet::new();
    for key in [ANY_AGENT, agent] {
        if let Some(agent_rules) = agents.get(key) {
            rules.extend(agent_rules.disallow.iter().map(String::as_str));
        }
    }

    if rules.is_empty() {
        return None;
    }

    let alternation = rules
        .iter()
        .map(|rule| rule_to_regex(rule))
        .collect::<Vec<_>>()
        .join("|");

    match Regex::new(&alternation) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(agent = %agent, error = %e, "Failed to compile robots.txt rules");
            None
        }
    }
}

/// Translates a robots.txt path rule into a regex fragment
///
/// `*` matches any run of characters and a trailing `$` anchors the rule at
/// the end of the URL; everything else is literal.
fn rule_to_regex(rule: &str) -> String {
    let (body, anchored) = match rule.strip_suffix('$') {
        Some(body) => (body, true),
        None => (rule, false),
    };

    let pattern = body
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    if anchored {
        format!("(?:{})$", pattern)
    } else {
        format!("(?:{})", pattern)
    }
}
