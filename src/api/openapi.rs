//! OpenAPI document and Swagger UI wiring.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{handlers, response, storage};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    paths(
        handlers::root::root,
        handlers::health::health,
        handlers::sign_up::sign_up,
        handlers::sign_in::sign_in,
        handlers::password_reset::password_reset,
        handlers::sign_out::sign_out,
        handlers::children::list_children,
        handlers::children::add_child,
        handlers::children::delete_child,
        handlers::children::add_vaccination,
        handlers::children::delete_vaccination,
        handlers::children::add_allergy,
        handlers::children::delete_allergy,
        handlers::children::add_growth,
    ),
    components(schemas(
        response::ErrorCode,
        response::TokenData,
        handlers::sign_up::SignUpRequest,
        handlers::sign_in::SignInRequest,
        handlers::password_reset::PasswordResetRequest,
        handlers::children::AddChildRequest,
        handlers::children::AddVaccinationRequest,
        handlers::children::AddAllergyRequest,
        handlers::children::AddGrowthRequest,
        handlers::children::ChildData,
        handlers::children::RecordData,
        storage::ChildProfile,
        storage::GrowthSnapshot,
        storage::VaccinationEntry,
        storage::AllergyEntry,
    )),
    tags(
        (name = "account", description = "Account and session endpoints"),
        (name = "children", description = "Child record endpoints"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Swagger UI serving the generated document.
#[must_use]
pub fn swagger() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_account_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/v1/account/sign-up"));
        assert!(paths.contains_key("/v1/account/sign-in"));
        assert!(paths.contains_key("/v1/account/password-reset"));
        assert!(paths.contains_key("/v1/account/sign-out"));
        assert!(paths.contains_key("/v1/children"));
    }

    #[test]
    fn openapi_document_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components should exist");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
