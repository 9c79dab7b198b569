//! Child record endpoints. All of them require a bearer session token and
//! only ever touch children of the authenticated account.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{
    handlers::bearer_token,
    response::{self, ErrorCode},
    storage::{ChildStore, NewChild, NewGrowth, TokenStore},
    validation::{failed_checks, fire, valid_measurement, Rule},
};

/// New child id returned on creation.
#[derive(ToSchema, Serialize, Debug)]
pub struct ChildData {
    pub child_id: Uuid,
}

/// Id of a newly created record row.
#[derive(ToSchema, Serialize, Debug)]
pub struct RecordData {
    pub id: Uuid,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AddChildRequest {
    user_name: Option<String>,
    birthday: Option<String>,
    gender: Option<String>,
    blood_type: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AddVaccinationRequest {
    vaccine_name: Option<String>,
    visit_date: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AddAllergyRequest {
    allergy_name: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AddGrowthRequest {
    body_height: Option<f64>,
    body_weight: Option<f64>,
    clothes_size: Option<String>,
    shoes_size: Option<String>,
    recorded_on: Option<String>,
}

/// Resolve the bearer token or produce the response that ends the request.
async fn authorize(headers: &HeaderMap, tokens: &TokenStore) -> Result<Uuid, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err(response::unauthorized());
    };
    match tokens.authenticate(&token).await {
        Ok(Some(account_id)) => Ok(account_id),
        Ok(None) => Err(response::unauthorized()),
        Err(e) => {
            error!("Error authenticating token: {e:?}");
            Err(response::internal_error())
        }
    }
}

fn child_format_errors(fields: &AddChildFields) -> Vec<ErrorCode> {
    failed_checks(&[
        (
            ErrorCode::ValidationUserName,
            fire(&fields.user_name, Rule::UserName),
        ),
        (
            ErrorCode::ValidationBirthday,
            fire(&fields.birthday, Rule::Date),
        ),
        (ErrorCode::ValidationGender, fire(&fields.gender, Rule::Gender)),
        (
            ErrorCode::ValidationBloodType,
            fire(&fields.blood_type, Rule::BloodType),
        ),
    ])
}

struct AddChildFields {
    user_name: String,
    birthday: String,
    gender: String,
    blood_type: String,
}

impl AddChildRequest {
    fn require(self) -> Option<AddChildFields> {
        Some(AddChildFields {
            user_name: self.user_name?,
            birthday: self.birthday?,
            gender: self.gender?,
            blood_type: self.blood_type?,
        })
    }
}

#[utoipa::path(
    get,
    path = "/v1/children",
    responses(
        (status = 200, description = "Active children with latest growth, vaccinations, allergies"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children))]
pub async fn list_children(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match children.list_children(account_id).await {
        Ok(list) => response::ok(list),
        Err(e) => {
            error!("Error listing children: {e:?}");
            response::internal_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/children",
    request_body = AddChildRequest,
    responses(
        (status = 200, description = "Child created", body = ChildData),
        (status = 400, description = "Missing or malformed fields"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children, payload))]
pub async fn add_child(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    payload: Option<Json<AddChildRequest>>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let Some(fields) = request.require() else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    let errors = child_format_errors(&fields);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    let Ok(birthday) = NaiveDate::parse_from_str(&fields.birthday, "%Y-%m-%d") else {
        return response::bad_request(vec![ErrorCode::ValidationBirthday]);
    };

    let new_child = NewChild {
        user_name: &fields.user_name,
        birthday,
        gender: &fields.gender,
        blood_type: &fields.blood_type,
    };

    match children.add_child(account_id, &new_child).await {
        Ok(child_id) => response::ok(ChildData { child_id }),
        Err(e) => {
            error!("Error adding child: {e:?}");
            response::internal_error()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/children/{child_id}",
    params(("child_id" = Uuid, Path, description = "Child id")),
    responses(
        (status = 200, description = "Child soft-deleted"),
        (status = 400, description = "Child unknown or not owned by this account"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children))]
pub async fn delete_child(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path(child_id): Path<Uuid>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match children.soft_delete_child(account_id, child_id).await {
        Ok(true) => response::ok_empty(),
        Ok(false) => response::bad_request(vec![ErrorCode::UnknownChild]),
        Err(e) => {
            error!("Error deleting child: {e:?}");
            response::internal_error()
        }
    }
}

fn vaccination_format_errors(vaccine_name: &str, visit_date: &str) -> Vec<ErrorCode> {
    failed_checks(&[
        (
            ErrorCode::ValidationVaccineName,
            fire(vaccine_name, Rule::ItemName),
        ),
        (ErrorCode::ValidationVisitDate, fire(visit_date, Rule::Date)),
    ])
}

#[utoipa::path(
    post,
    path = "/v1/children/{child_id}/vaccinations",
    params(("child_id" = Uuid, Path, description = "Child id")),
    request_body = AddVaccinationRequest,
    responses(
        (status = 200, description = "Vaccination recorded", body = RecordData),
        (status = 400, description = "Missing/malformed fields or unknown child"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children, payload))]
pub async fn add_vaccination(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path(child_id): Path<Uuid>,
    payload: Option<Json<AddVaccinationRequest>>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let (Some(vaccine_name), Some(visit_date)) = (request.vaccine_name, request.visit_date) else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    let errors = vaccination_format_errors(&vaccine_name, &visit_date);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    match ensure_owned(&children, account_id, child_id).await {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    let Ok(visit_date) = NaiveDate::parse_from_str(&visit_date, "%Y-%m-%d") else {
        return response::bad_request(vec![ErrorCode::ValidationVisitDate]);
    };

    match children
        .add_vaccination(child_id, &vaccine_name, visit_date)
        .await
    {
        Ok(id) => response::ok(RecordData { id }),
        Err(e) => {
            error!("Error adding vaccination: {e:?}");
            response::internal_error()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/children/{child_id}/vaccinations/{vaccination_id}",
    params(
        ("child_id" = Uuid, Path, description = "Child id"),
        ("vaccination_id" = Uuid, Path, description = "Vaccination id"),
    ),
    responses(
        (status = 200, description = "Vaccination removed"),
        (status = 400, description = "Unknown child or vaccination"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children))]
pub async fn delete_vaccination(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path((child_id, vaccination_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match ensure_owned(&children, account_id, child_id).await {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    match children.delete_vaccination(child_id, vaccination_id).await {
        Ok(true) => response::ok_empty(),
        Ok(false) => response::bad_request(vec![ErrorCode::UnknownVaccination]),
        Err(e) => {
            error!("Error deleting vaccination: {e:?}");
            response::internal_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/children/{child_id}/allergies",
    params(("child_id" = Uuid, Path, description = "Child id")),
    request_body = AddAllergyRequest,
    responses(
        (status = 200, description = "Allergy recorded", body = RecordData),
        (status = 400, description = "Missing/malformed fields or unknown child"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children, payload))]
pub async fn add_allergy(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path(child_id): Path<Uuid>,
    payload: Option<Json<AddAllergyRequest>>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let Some(allergy_name) = request.allergy_name else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    if !fire(&allergy_name, Rule::ItemName) {
        return response::bad_request(vec![ErrorCode::ValidationAllergyName]);
    }

    match ensure_owned(&children, account_id, child_id).await {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    match children.add_allergy(child_id, &allergy_name).await {
        Ok(id) => response::ok(RecordData { id }),
        Err(e) => {
            error!("Error adding allergy: {e:?}");
            response::internal_error()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/children/{child_id}/allergies/{allergy_id}",
    params(
        ("child_id" = Uuid, Path, description = "Child id"),
        ("allergy_id" = Uuid, Path, description = "Allergy id"),
    ),
    responses(
        (status = 200, description = "Allergy removed"),
        (status = 400, description = "Unknown child or allergy"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children))]
pub async fn delete_allergy(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path((child_id, allergy_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match ensure_owned(&children, account_id, child_id).await {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    match children.delete_allergy(child_id, allergy_id).await {
        Ok(true) => response::ok_empty(),
        Ok(false) => response::bad_request(vec![ErrorCode::UnknownAllergy]),
        Err(e) => {
            error!("Error deleting allergy: {e:?}");
            response::internal_error()
        }
    }
}

struct GrowthFields {
    body_height: f64,
    body_weight: f64,
    clothes_size: String,
    shoes_size: String,
    recorded_on: String,
}

impl AddGrowthRequest {
    fn require(self) -> Option<GrowthFields> {
        Some(GrowthFields {
            body_height: self.body_height?,
            body_weight: self.body_weight?,
            clothes_size: self.clothes_size?,
            shoes_size: self.shoes_size?,
            recorded_on: self.recorded_on?,
        })
    }
}

fn growth_format_errors(fields: &GrowthFields) -> Vec<ErrorCode> {
    failed_checks(&[
        (
            ErrorCode::ValidationMeasurement,
            valid_measurement(fields.body_height) && valid_measurement(fields.body_weight),
        ),
        (
            ErrorCode::ValidationClothesSize,
            fire(&fields.clothes_size, Rule::SizeLabel),
        ),
        (
            ErrorCode::ValidationShoesSize,
            fire(&fields.shoes_size, Rule::SizeLabel),
        ),
        (
            ErrorCode::ValidationRecordedOn,
            fire(&fields.recorded_on, Rule::Date),
        ),
    ])
}

#[utoipa::path(
    post,
    path = "/v1/children/{child_id}/growth",
    params(("child_id" = Uuid, Path, description = "Child id")),
    request_body = AddGrowthRequest,
    responses(
        (status = 200, description = "Growth record added", body = RecordData),
        (status = 400, description = "Missing/malformed fields or unknown child"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "children"
)]
#[instrument(skip(headers, tokens, children, payload))]
pub async fn add_growth(
    headers: HeaderMap,
    tokens: Extension<TokenStore>,
    children: Extension<ChildStore>,
    Path(child_id): Path<Uuid>,
    payload: Option<Json<AddGrowthRequest>>,
) -> Response {
    let account_id = match authorize(&headers, &tokens).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let Some(fields) = request.require() else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    let errors = growth_format_errors(&fields);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    match ensure_owned(&children, account_id, child_id).await {
        Ok(()) => {}
        Err(resp) => return resp,
    }

    let Ok(recorded_on) = NaiveDate::parse_from_str(&fields.recorded_on, "%Y-%m-%d") else {
        return response::bad_request(vec![ErrorCode::ValidationRecordedOn]);
    };

    let growth = NewGrowth {
        body_height: fields.body_height,
        body_weight: fields.body_weight,
        clothes_size: &fields.clothes_size,
        shoes_size: &fields.shoes_size,
        recorded_on,
    };

    match children.add_growth(child_id, &growth).await {
        Ok(id) => response::ok(RecordData { id }),
        Err(e) => {
            error!("Error adding growth record: {e:?}");
            response::internal_error()
        }
    }
}

/// Ownership gate shared by the child-scoped endpoints.
async fn ensure_owned(
    children: &ChildStore,
    account_id: Uuid,
    child_id: Uuid,
) -> Result<(), Response> {
    match children.owns_child(account_id, child_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(response::bad_request(vec![ErrorCode::UnknownChild])),
        Err(e) => {
            error!("Error checking child ownership: {e:?}");
            Err(response::internal_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_fields_require_all() {
        let request = AddChildRequest {
            user_name: Some("Mia".to_string()),
            birthday: Some("2020-05-04".to_string()),
            gender: Some("female".to_string()),
            blood_type: None,
        };
        assert!(request.require().is_none());
    }

    #[test]
    fn child_format_errors_in_field_order() {
        let fields = AddChildFields {
            user_name: String::new(),
            birthday: "2020-02-30".to_string(),
            gender: "girl".to_string(),
            blood_type: "ab".to_string(),
        };
        assert_eq!(
            child_format_errors(&fields),
            vec![
                ErrorCode::ValidationUserName,
                ErrorCode::ValidationBirthday,
                ErrorCode::ValidationGender,
            ]
        );
    }

    #[test]
    fn vaccination_format_errors_aggregate() {
        assert_eq!(
            vaccination_format_errors("", "yesterday"),
            vec![
                ErrorCode::ValidationVaccineName,
                ErrorCode::ValidationVisitDate,
            ]
        );
        assert!(vaccination_format_errors("MMR", "2024-11-02").is_empty());
    }

    #[test]
    fn growth_format_errors_check_measurements_together() {
        let fields = GrowthFields {
            body_height: -3.0,
            body_weight: 14.2,
            clothes_size: "90".to_string(),
            shoes_size: "13.5".to_string(),
            recorded_on: "2024-11-02".to_string(),
        };
        assert_eq!(
            growth_format_errors(&fields),
            vec![ErrorCode::ValidationMeasurement]
        );
    }

    #[test]
    fn growth_format_ok_for_valid_fields() {
        let fields = GrowthFields {
            body_height: 86.5,
            body_weight: 12.3,
            clothes_size: "90".to_string(),
            shoes_size: "13.5".to_string(),
            recorded_on: "2024-11-02".to_string(),
        };
        assert!(growth_format_errors(&fields).is_empty());
    }
}
