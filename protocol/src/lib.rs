//! A small, hand-written slice of CDP domain types.
//!
//! The full protocol has hundreds of commands and events across dozens of domains, generated
//! mechanically from Chromium's `.pdl` protocol definitions. That generator and its output are
//! out of scope here; this crate carries just enough typed commands and events to exercise
//! `cdp_session`'s transport/router/session layer end-to-end in examples and integration tests.
//! Callers needing full domain coverage use `cdp_session::send`/`subscribe` directly with
//! `serde_json::Value` params — the core never requires a typed binding to function.

use cdp_types::{Command, Method, MethodId, MethodType};
use serde::{Deserialize, Serialize};

pub mod target {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct SetDiscoverTargetsParams {
        pub discover: bool,
    }

    impl SetDiscoverTargetsParams {
        pub fn new(discover: bool) -> Self {
            Self { discover }
        }
    }

    impl Method for SetDiscoverTargetsParams {
        fn identifier(&self) -> MethodId {
            "Target.setDiscoverTargets".into()
        }
    }

    impl Command for SetDiscoverTargetsParams {
        type Response = serde_json::Value;
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CreateTargetParams {
        pub url: String,
        #[serde(rename = "newWindow", skip_serializing_if = "Option::is_none")]
        pub new_window: Option<bool>,
    }

    impl CreateTargetParams {
        pub fn new(url: impl Into<String>) -> Self {
            Self { url: url.into(), new_window: None }
        }
    }

    impl Method for CreateTargetParams {
        fn identifier(&self) -> MethodId {
            "Target.createTarget".into()
        }
    }

    impl Command for CreateTargetParams {
        type Response = CreateTargetResult;
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CreateTargetResult {
        #[serde(rename = "targetId")]
        pub target_id: String,
    }
}

pub mod page {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct NavigateParams {
        pub url: String,
    }

    impl NavigateParams {
        pub fn new(url: impl Into<String>) -> Self {
            Self { url: url.into() }
        }
    }

    impl Method for NavigateParams {
        fn identifier(&self) -> MethodId {
            "Page.navigate".into()
        }
    }

    impl Command for NavigateParams {
        type Response = NavigateResult;
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct NavigateResult {
        #[serde(rename = "frameId")]
        pub frame_id: String,
        #[serde(rename = "errorText", default)]
        pub error_text: Option<String>,
    }

    /// Fired once the page's `load` event has fired.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct EventLoadEventFired {
        pub timestamp: f64,
    }

    impl Method for EventLoadEventFired {
        fn identifier(&self) -> MethodId {
            "Page.loadEventFired".into()
        }
    }

    impl MethodType for EventLoadEventFired {
        fn method_id() -> MethodId {
            "Page.loadEventFired".into()
        }
    }
}

pub mod network {
    use super::*;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct EnableParams {}

    impl Method for EnableParams {
        fn identifier(&self) -> MethodId {
            "Network.enable".into()
        }
    }

    impl Command for EnableParams {
        type Response = serde_json::Value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigate_params_serializes_expected_shape() {
        let params = page::NavigateParams::new("https://example.com");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(params.identifier(), "Page.navigate");
    }

    #[test]
    fn discover_targets_identifier_matches_domain() {
        let params = target::SetDiscoverTargetsParams::new(true);
        assert_eq!(params.domain_name(), "Target");
        assert_eq!(params.method_name(), "setDiscoverTargets");
    }
}
