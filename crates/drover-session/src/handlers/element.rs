use serde_json::Value;

use drover_protocol::error_codes;
use drover_protocol::{Parameters, Response};

use crate::handlers::CommandHandler;
use crate::registry::{ElementLookupError, SessionRegistry};

/// `getElementAttribute`: read one attribute of a registered element.
///
/// Required parameters: `id` (element id), `name` (attribute name). An
/// attribute the element does not carry is an explicit null success, not
/// an error.
pub struct GetElementAttributeHandler;

impl CommandHandler for GetElementAttributeHandler {
    fn execute(
        &self,
        registry: &mut SessionRegistry,
        parameters: &Parameters,
        response: &mut Response,
    ) {
        let Some(element_id) = parameters.get("id").and_then(Value::as_str) else {
            response.set_error_response(error_codes::INVALID_ARGUMENT, "Missing parameter: id");
            return;
        };
        let Some(name) = parameters.get("name").and_then(Value::as_str) else {
            response.set_error_response(error_codes::INVALID_ARGUMENT, "Missing parameter: name");
            return;
        };

        if registry.current_browser().is_err() {
            response.set_error_response(error_codes::NO_SUCH_WINDOW, "Unable to get browser");
            return;
        }

        let element = match registry.element(element_id) {
            Ok(element) => element,
            Err(ElementLookupError::NotFound) => {
                response.set_error_response(
                    error_codes::NO_SUCH_ELEMENT,
                    &format!("Invalid internal element ID requested: {}", element_id),
                );
                return;
            }
            Err(ElementLookupError::Stale) => {
                response.set_error_response(
                    error_codes::STALE_ELEMENT_REFERENCE,
                    "Element is no longer valid",
                );
                return;
            }
        };

        match element.attribute_value(name) {
            Ok(Some(value)) => {
                response.set_success_response(value);
            }
            Ok(None) => {
                response.set_success_response(Value::Null);
            }
            Err(status_code) => {
                response.set_error_response(status_code, "Unable to get attribute");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBrowser, FakeElement};
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        let mut map = Parameters::new();
        for (key, value) in pairs {
            map.insert(key.to_string(), json!(value));
        }
        map
    }

    fn registry_with_browser() -> SessionRegistry {
        let mut registry = SessionRegistry::new();
        registry.register_browser(FakeBrowser::open("b1").as_browser());
        registry
    }

    #[test]
    fn test_present_attribute_yields_string_success() {
        let mut registry = registry_with_browser();
        let element = FakeElement::attached().with_attribute("value", "hello");
        registry.register_element("e1", element.as_element());

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1"), ("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::SUCCESS);
        assert_eq!(response.value, json!("hello"));
    }

    #[test]
    fn test_absent_attribute_yields_null_success_not_error() {
        let mut registry = registry_with_browser();
        registry.register_element("e1", FakeElement::attached().as_element());

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1"), ("name", "nonexistent")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::SUCCESS);
        assert!(response.value.is_null());
    }

    #[test]
    fn test_unregistered_element_id_yields_no_such_element() {
        let mut registry = registry_with_browser();

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "ghost"), ("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::NO_SUCH_ELEMENT);
    }

    #[test]
    fn test_detached_element_yields_stale_reference_not_not_found() {
        let mut registry = registry_with_browser();
        let element = FakeElement::attached();
        registry.register_element("e1", element.as_element());
        element.detach();

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1"), ("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::STALE_ELEMENT_REFERENCE);
    }

    #[test]
    fn test_missing_id_parameter_short_circuits() {
        let mut registry = SessionRegistry::new();

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::INVALID_ARGUMENT);
        assert_eq!(response.value["message"], "Missing parameter: id");
    }

    #[test]
    fn test_missing_name_parameter_beats_browser_resolution() {
        // No browser registered: if resolution ran first this would be
        // NO_SUCH_WINDOW. Validation must win.
        let mut registry = SessionRegistry::new();

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::INVALID_ARGUMENT);
        assert_eq!(response.value["message"], "Missing parameter: name");
    }

    #[test]
    fn test_no_browser_yields_no_such_window_before_element_lookup() {
        let mut registry = SessionRegistry::new();
        registry.register_element("e1", FakeElement::attached().as_element());

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1"), ("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, error_codes::NO_SUCH_WINDOW);
    }

    #[test]
    fn test_domain_status_code_is_surfaced_verbatim() {
        let mut registry = registry_with_browser();
        let element = FakeElement::attached().failing_with(17);
        registry.register_element("e1", element.as_element());

        let mut response = Response::new();
        GetElementAttributeHandler.execute(
            &mut registry,
            &params(&[("id", "e1"), ("name", "value")]),
            &mut response,
        );

        assert_eq!(response.status, 17);
        assert_eq!(response.value["message"], "Unable to get attribute");
    }
}
