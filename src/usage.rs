//! Usage accounting for coverage reports.
//!
//! A [`Usage`] starts out with every declared element at zero. Each check
//! produces its own usage, and aggregation merges them by adding counters.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::contract::{Api, Method};

/// Use counts keyed by declared name.
pub type Counters = IndexMap<String, u64>;

/// Usage of a whole contract, keyed by full resource uri.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Usage {
    pub resources: IndexMap<String, ResourceUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub uses: u64,
    /// Keyed by uppercase verb.
    pub actions: IndexMap<String, ActionUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionUsage {
    pub uses: u64,
    pub query_parameters: Counters,
    pub request_headers: Counters,
    pub form_parameters: Counters,
    /// Keyed by status code.
    pub responses: IndexMap<String, ResponseUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseUsage {
    pub uses: u64,
    pub headers: Counters,
}

fn zeroed<'a>(names: impl IntoIterator<Item = &'a String>) -> Counters {
    names.into_iter().map(|n| (n.clone(), 0)).collect()
}

fn add_all(target: &mut Counters, source: &Counters) {
    for (name, count) in source {
        *target.entry(name.clone()).or_default() += count;
    }
}

/// Increment a counter that is already declared; unknown names are ignored.
pub(crate) fn touch(counters: &mut Counters, name: &str) {
    if let Some(count) = counters.get_mut(name) {
        *count += 1;
    }
}

impl ActionUsage {
    fn from_method(method: &Method) -> Self {
        Self {
            uses: 0,
            query_parameters: zeroed(method.query_parameters.keys()),
            request_headers: zeroed(method.headers.keys()),
            form_parameters: zeroed(method.body.values().flat_map(|b| b.form_parameters.keys())),
            responses: method
                .responses
                .iter()
                .map(|(code, response)| {
                    (
                        code.clone(),
                        ResponseUsage {
                            uses: 0,
                            headers: zeroed(response.headers.keys()),
                        },
                    )
                })
                .collect(),
        }
    }

    fn merge(&mut self, other: &ActionUsage) {
        self.uses += other.uses;
        add_all(&mut self.query_parameters, &other.query_parameters);
        add_all(&mut self.request_headers, &other.request_headers);
        add_all(&mut self.form_parameters, &other.form_parameters);
        for (code, response) in &other.responses {
            let target = self.responses.entry(code.clone()).or_default();
            target.uses += response.uses;
            add_all(&mut target.headers, &response.headers);
        }
    }
}

impl Usage {
    /// All-zero usage for every element the contract declares.
    pub fn from_contract(api: &Api) -> Self {
        let resources = api
            .resource_paths()
            .into_iter()
            .map(|(uri, resource)| {
                let actions = resource
                    .methods
                    .values()
                    .map(|m| (m.verb.clone(), ActionUsage::from_method(m)))
                    .collect();
                (uri, ResourceUsage { uses: 0, actions })
            })
            .collect();
        Self { resources }
    }

    pub fn resource_mut(&mut self, uri: &str) -> Option<&mut ResourceUsage> {
        self.resources.get_mut(uri)
    }

    pub fn action_mut(&mut self, uri: &str, verb: &str) -> Option<&mut ActionUsage> {
        self.resources
            .get_mut(uri)
            .and_then(|r| r.actions.get_mut(&verb.to_ascii_uppercase()))
    }

    /// Add all counters of `other` into `self`.
    pub fn merge(&mut self, other: &Usage) {
        for (uri, resource) in &other.resources {
            let target = self.resources.entry(uri.clone()).or_default();
            target.uses += resource.uses;
            for (verb, action) in &resource.actions {
                target.actions.entry(verb.clone()).or_default().merge(action);
            }
        }
    }

    /// List every declared element that was never exercised.
    pub fn coverage(&self) -> Coverage {
        let mut c = Coverage::default();
        for (uri, resource) in &self.resources {
            note(&mut c.total, &mut c.unused_resources, resource.uses, uri.clone());
            for (verb, action) in &resource.actions {
                let action_name = format!("{} {}", verb, uri);
                note(&mut c.total, &mut c.unused_actions, action.uses, action_name.clone());
                for (name, count) in &action.query_parameters {
                    let entry = format!("{} in {}", name, action_name);
                    note(&mut c.total, &mut c.unused_query_parameters, *count, entry);
                }
                for (name, count) in &action.request_headers {
                    let entry = format!("{} in {}", name, action_name);
                    note(&mut c.total, &mut c.unused_request_headers, *count, entry);
                }
                for (name, count) in &action.form_parameters {
                    let entry = format!("{} in {}", name, action_name);
                    note(&mut c.total, &mut c.unused_form_parameters, *count, entry);
                }
                for (code, response) in &action.responses {
                    let entry = format!("{} in {}", code, action_name);
                    note(&mut c.total, &mut c.unused_response_codes, response.uses, entry);
                    for (name, count) in &response.headers {
                        let entry = format!("{} in {} of {}", name, code, action_name);
                        note(&mut c.total, &mut c.unused_response_headers, *count, entry);
                    }
                }
            }
        }
        c
    }
}

fn note(total: &mut usize, unused: &mut Vec<String>, count: u64, name: String) {
    *total += 1;
    if count == 0 {
        unused.push(name);
    }
}

/// Declared elements that were never used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub unused_resources: Vec<String>,
    pub unused_actions: Vec<String>,
    pub unused_query_parameters: Vec<String>,
    pub unused_request_headers: Vec<String>,
    pub unused_form_parameters: Vec<String>,
    pub unused_response_codes: Vec<String>,
    pub unused_response_headers: Vec<String>,
    /// Number of declared elements.
    pub total: usize,
}

impl Coverage {
    pub fn unused(&self) -> usize {
        self.unused_resources.len()
            + self.unused_actions.len()
            + self.unused_query_parameters.len()
            + self.unused_request_headers.len()
            + self.unused_form_parameters.len()
            + self.unused_response_codes.len()
            + self.unused_response_headers.len()
    }

    /// Fraction of declared elements never used; 0.0 for an empty contract.
    pub fn unused_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unused() as f64 / self.total as f64
        }
    }
}

/// Usage accumulator shared by checks running on several threads.
#[derive(Debug, Clone, Default)]
pub struct SharedUsage {
    inner: Arc<Mutex<Usage>>,
}

impl SharedUsage {
    pub fn new(usage: Usage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(usage)),
        }
    }

    /// Start from the all-zero usage of a contract.
    pub fn for_contract(api: &Api) -> Self {
        Self::new(Usage::from_contract(api))
    }

    pub fn merge(&self, usage: &Usage) {
        self.inner.lock().merge(usage);
    }

    pub fn snapshot(&self) -> Usage {
        self.inner.lock().clone()
    }
}
