use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::dto::{
    BalancesJson, CreateExpenseJson, CreateGroupJson, CreatedExpenseJson, GroupJson,
    UserBalancesJson,
};
use crate::error::LedgerError;
use crate::ledger::{Ledger, NewExpense};
use crate::schemas::GroupId;
use crate::store::GroupStore;

pub fn configure<S: GroupStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/groups")
                .route(web::get().to(list_groups::<S>))
                .route(web::post().to(add_group::<S>)),
        )
        .service(
            web::resource("/groups/{id}")
                .route(web::get().to(get_group::<S>))
                .route(web::delete().to(delete_group::<S>)),
        )
        .service(web::resource("/groups/{id}/expenses").route(web::post().to(add_expense::<S>)))
        .service(web::resource("/groups/{id}/balances").route(web::get().to(get_balances::<S>)))
        .service(
            web::resource("/users/{name}/balances").route(web::get().to(get_user_balances::<S>)),
        );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Group Ledger API" }))
}

async fn list_groups<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
) -> Result<HttpResponse, LedgerError> {
    let groups = ledger.list_groups().await?;
    let groups: Vec<GroupJson> = groups.iter().map(GroupJson::from).collect();
    Ok(HttpResponse::Ok().json(groups))
}

async fn add_group<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    json: web::Json<CreateGroupJson>,
) -> Result<HttpResponse, LedgerError> {
    let json = json.into_inner();
    let group = ledger.create_group(&json.name, &json.users).await?;
    Ok(HttpResponse::Created().json(GroupJson::from(&group)))
}

async fn get_group<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, LedgerError> {
    let group = ledger.group(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(GroupJson::from(&group)))
}

async fn delete_group<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, LedgerError> {
    ledger.delete_group(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn add_expense<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    id: web::Path<GroupId>,
    json: web::Json<CreateExpenseJson>,
) -> Result<HttpResponse, LedgerError> {
    let expense = NewExpense::try_from(json.into_inner())?;
    let added = ledger.add_expense(id.into_inner(), expense).await?;
    Ok(HttpResponse::Created().json(CreatedExpenseJson::new(
        &added.group,
        &added.expense,
        &added.shares,
    )))
}

async fn get_balances<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, LedgerError> {
    let report = ledger.group_report(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(BalancesJson::from(&report)))
}

async fn get_user_balances<S: GroupStore>(
    ledger: web::Data<Ledger<S>>,
    name: web::Path<String>,
) -> Result<HttpResponse, LedgerError> {
    let summary = ledger.user_summary(&name.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserBalancesJson::from(&summary)))
}
