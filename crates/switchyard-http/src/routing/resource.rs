//! Resource expansion into conventional CRUD routes

use super::{HttpMethod, RouteDefinition, RouteType};
use std::fmt;

/// The seven conventional resource actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Index,
    Create,
    Store,
    Show,
    Edit,
    Update,
    Destroy,
}

impl ResourceAction {
    /// Registration order; `create` precedes `show` so `/name/create` is not captured as an id
    pub const ALL: [ResourceAction; 7] = [
        ResourceAction::Index,
        ResourceAction::Create,
        ResourceAction::Store,
        ResourceAction::Show,
        ResourceAction::Edit,
        ResourceAction::Update,
        ResourceAction::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Index => "index",
            ResourceAction::Create => "create",
            ResourceAction::Store => "store",
            ResourceAction::Show => "show",
            ResourceAction::Edit => "edit",
            ResourceAction::Update => "update",
            ResourceAction::Destroy => "destroy",
        }
    }

    fn methods(&self) -> &'static [HttpMethod] {
        match self {
            ResourceAction::Index | ResourceAction::Create | ResourceAction::Show | ResourceAction::Edit => {
                &[HttpMethod::GET]
            }
            ResourceAction::Store => &[HttpMethod::POST],
            ResourceAction::Update => &[HttpMethod::PUT, HttpMethod::PATCH],
            ResourceAction::Destroy => &[HttpMethod::DELETE],
        }
    }

    fn path(&self, base: &str, param: &str) -> String {
        match self {
            ResourceAction::Index | ResourceAction::Store => base.to_string(),
            ResourceAction::Create => format!("{}/create", base),
            ResourceAction::Show | ResourceAction::Update | ResourceAction::Destroy => {
                format!("{}/:{}", base, param)
            }
            ResourceAction::Edit => format!("{}/:{}/edit", base, param),
        }
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `RouteRegistry::resource`
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub route_type: RouteType,
    /// Restrict to these actions; `None` keeps all
    pub only: Option<Vec<ResourceAction>>,
    pub except: Vec<ResourceAction>,
    /// Name of the identifier parameter, `id` by default
    pub parameter: Option<String>,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            route_type: RouteType::Api,
            only: None,
            except: Vec::new(),
            parameter: None,
        }
    }
}

impl ResourceOptions {
    pub fn new(route_type: RouteType) -> Self {
        Self {
            route_type,
            ..Self::default()
        }
    }

    pub fn only(mut self, actions: &[ResourceAction]) -> Self {
        self.only = Some(actions.to_vec());
        self
    }

    pub fn except(mut self, actions: &[ResourceAction]) -> Self {
        self.except.extend_from_slice(actions);
        self
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    fn includes(&self, action: ResourceAction) -> bool {
        let listed = self.only.as_ref().map_or(true, |only| only.contains(&action));
        listed && !self.except.contains(&action)
    }
}

/// Route definitions for `name` handled by `controller`, in registration order
pub(crate) fn expand(name: &str, controller: &str, options: &ResourceOptions) -> Vec<RouteDefinition> {
    let base = format!("/{}", name.trim_matches('/'));
    let route_name = name.trim_matches('/').replace('/', ".");
    let param = options.parameter.as_deref().unwrap_or("id");

    ResourceAction::ALL
        .iter()
        .filter(|action| options.includes(**action))
        .map(|action| {
            RouteDefinition::match_methods(
                options.route_type,
                action.methods(),
                action.path(&base, param),
                format!("{}@{}", controller, action),
            )
            .name(format!("{}.{}", route_name, action))
        })
        .collect()
}
