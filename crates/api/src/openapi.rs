//! OpenAPI 3 document for the public API.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::config::SchemaConfig;
use crate::error::ErrorBody;
use crate::handlers::{admin, jwt, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        users::create,
        users::activation,
        users::resend_activation,
        users::me,
        users::update_me,
        users::delete_me,
        users::list,
        users::retrieve,
        users::update,
        users::destroy,
        users::set_password,
        users::reset_password,
        users::reset_password_confirm,
        jwt::create,
        jwt::refresh,
        jwt::verify,
        admin::list_users,
        admin::create_user,
        admin::get_user,
        admin::update_user,
        admin::set_user_password,
        admin::delete_user,
    ),
    components(schemas(ErrorBody)),
    modifiers(&JwtSecurity),
    tags(
        (name = "users", description = "Registration, activation, and password flows"),
        (name = "jwt", description = "Access and refresh tokens"),
        (name = "admin", description = "User administration"),
    )
)]
pub struct ApiDoc;

/// Registers the `jwt` security scheme referenced by authenticated paths.
struct JwtSecurity;

impl Modify for JwtSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "JWT <access token>",
            ))),
        );
    }
}

/// The document with title, description, and version taken from config.
pub fn build_openapi(schema: &SchemaConfig) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = schema.title.clone();
    doc.info.description = Some(schema.description.clone());
    doc.info.version = schema.version.clone();
    doc
}
