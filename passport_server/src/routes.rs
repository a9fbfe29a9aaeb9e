//! Request handler definitions
//!
//! Define each route and its handler here. Handlers validate their input, call exactly one usecase API (or two, where
//! a token must be resolved to a user first) and wrap the result in the response envelope. Anything longer belongs in
//! the engine.
//!
//! Every handler is async and must not block the worker thread: database and cache calls are awaited, never waited
//! on.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use passport_engine::{
    traits::{BrandManagement, KeyValueStore, UserManagement, WalletManagement},
    BrandApi,
    UserApi,
    WalletApi,
};
use validator::Validate;

use crate::{
    auth::{AccessToken, RequestMeta},
    data_objects::{
        ApiResponse,
        BindPhoneRequest,
        BrandQuery,
        InnerUserResponse,
        MisLoginRequest,
        PhoneQuery,
        UserIdQuery,
        UserInfoResponse,
        WalletCondQuery,
        WalletEditRequest,
        WalletEditResponse,
        WalletIdQuery,
        WxLoginRequest,
        WxProfileRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Renders malformed query strings and JSON bodies as validation errors in the response envelope.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default().error_handler(|e, _| ServerError::ValidationError(e.to_string()).into()),
    )
    .app_data(web::JsonConfig::default().error_handler(|e, _| ServerError::ValidationError(e.to_string()).into()));
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/system/healthcheck")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    ApiResponse::ok("SUCCESS!")
}

//----------------------------------------------   Users  ----------------------------------------------------
route!(user_by_phone => Get "/user/phone" impl UserManagement, KeyValueStore);
pub async fn user_by_phone<B: UserManagement, C: KeyValueStore>(
    query: web::Query<PhoneQuery>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    query.validate()?;
    debug!("💻️ GET user by phone");
    let user = api.get_user_by_phone(&query.phone).await?;
    Ok(ApiResponse::ok(UserInfoResponse::from(user)))
}

route!(wx_login => Post "/user/wxh5/login" impl UserManagement, KeyValueStore);
/// Logs a registered WeChat user in. The stored token is reused while it is still valid; otherwise a new 30-day token
/// is issued.
pub async fn wx_login<B: UserManagement, C: KeyValueStore>(
    meta: RequestMeta,
    body: web::Json<WxLoginRequest>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    debug!("💻️ WeChat H5 login from {} {}", meta.os, meta.version);
    let result = api.login_wx_h5(&body.into()).await?;
    info!("💻️ User {} logged in with WeChat", result.user_id);
    Ok(ApiResponse::ok(result))
}

route!(wx_register => Post "/user/wxh5/register" impl UserManagement, KeyValueStore);
pub async fn wx_register<B: UserManagement, C: KeyValueStore>(
    meta: RequestMeta,
    body: web::Json<WxProfileRequest>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    debug!("💻️ WeChat H5 registration from {} {}", meta.os, meta.version);
    let user = api.register_c_user_by_wechat_user(&body.into()).await?;
    Ok(ApiResponse::ok(UserInfoResponse::from(user)))
}

route!(wx_bind_phone => Post "/user/wxh5/bind_phone" impl UserManagement, KeyValueStore);
pub async fn wx_bind_phone<B: UserManagement, C: KeyValueStore>(
    body: web::Json<BindPhoneRequest>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    debug!("💻️ Binding a phone number to WeChat user {}", body.unionid);
    api.bind_phone_for_wechat_c_user(&body.unionid, &body.phone).await?;
    Ok(ApiResponse::ok(()))
}

route!(wx_bind_info => Post "/user/wxh5/bind_info" impl UserManagement, KeyValueStore);
pub async fn wx_bind_info<B: UserManagement, C: KeyValueStore>(
    body: web::Json<WxProfileRequest>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    debug!("💻️ Binding additional information to WeChat user {}", body.unionid);
    api.bind_additional_info_for_wechat_c_user(&body.into()).await?;
    Ok(ApiResponse::ok(()))
}

route!(wx_unbind => Post "/user/wxh5/unbind" impl UserManagement, KeyValueStore);
pub async fn wx_unbind<B: UserManagement, C: KeyValueStore>(
    token: AccessToken,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Unbinding WeChat account");
    api.unbind_wechat_c_user(token.as_str()).await?;
    Ok(ApiResponse::ok(()))
}

route!(logout => Post "/user/logout" impl UserManagement, KeyValueStore);
pub async fn logout<B: UserManagement, C: KeyValueStore>(
    token: AccessToken,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Logging out");
    api.b_logout(token.as_str()).await?;
    Ok(ApiResponse::ok(()))
}

route!(user_info => Get "/user/info" impl UserManagement, KeyValueStore);
pub async fn user_info<B: UserManagement, C: KeyValueStore>(
    token: AccessToken,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let user = api.check_b_user_login(token.as_str()).await?;
    debug!("💻️ GET user info for user {}", user.id);
    Ok(ApiResponse::ok(UserInfoResponse::from(user)))
}

//----------------------------------------------   Administrators  ----------------------------------------------------
route!(mis_login => Post "/mis/login" impl UserManagement, KeyValueStore);
pub async fn mis_login<B: UserManagement, C: KeyValueStore>(
    meta: RequestMeta,
    body: web::Json<MisLoginRequest>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    debug!("💻️ Administrative login from {} {}", meta.os, meta.version);
    let result = api.mis_login(&body.phone, &body.pwd, body.keep != 0).await?;
    info!("💻️ Administrator {} logged in", result.user_id);
    Ok(ApiResponse::ok(result))
}

route!(mis_info => Get "/mis/info" impl UserManagement, KeyValueStore);
pub async fn mis_info<B: UserManagement, C: KeyValueStore>(
    token: AccessToken,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let user = api.check_mis_user_login(token.as_str()).await?;
    debug!("💻️ GET administrator info for user {}", user.id);
    Ok(ApiResponse::ok(UserInfoResponse::from(user)))
}

//----------------------------------------------   Brands  ----------------------------------------------------
route!(brand_list => Get "/brand/list" impl UserManagement, KeyValueStore, BrandManagement);
/// The brands the caller is a member of, each with its lease record.
pub async fn brand_list<B, C, D>(
    token: AccessToken,
    users: web::Data<UserApi<B, C>>,
    brands: web::Data<BrandApi<D>>,
) -> Result<HttpResponse, ServerError>
where
    B: UserManagement,
    C: KeyValueStore,
    D: BrandManagement,
{
    let user = users.check_b_user_login(token.as_str()).await?;
    debug!("💻️ GET brand list for user {}", user.id);
    let info = brands.get_brand_base_and_lease_info_by_user_id(user.id).await?;
    Ok(ApiResponse::ok(info))
}

route!(brand_full_info => Get "/brand/full_info" impl UserManagement, KeyValueStore, BrandManagement);
pub async fn brand_full_info<B, C, D>(
    token: AccessToken,
    query: web::Query<BrandQuery>,
    users: web::Data<UserApi<B, C>>,
    brands: web::Data<BrandApi<D>>,
) -> Result<HttpResponse, ServerError>
where
    B: UserManagement,
    C: KeyValueStore,
    D: BrandManagement,
{
    let query = query.into_inner();
    query.validate()?;
    let user = users.check_c_user_login(token.as_str(), query.brand_id).await?;
    debug!("💻️ GET full info of brand {} for user {}", query.brand_id, user.id);
    let info = brands.get_brand_full_info(query.brand_id).await?;
    Ok(ApiResponse::ok(info))
}

route!(brand_unimini_check => Get "/brand/unimini/check" impl UserManagement, KeyValueStore, BrandManagement);
pub async fn brand_unimini_check<B, C, D>(
    token: AccessToken,
    query: web::Query<BrandQuery>,
    users: web::Data<UserApi<B, C>>,
    brands: web::Data<BrandApi<D>>,
) -> Result<HttpResponse, ServerError>
where
    B: UserManagement,
    C: KeyValueStore,
    D: BrandManagement,
{
    let query = query.into_inner();
    query.validate()?;
    let user = users.check_c_user_login(token.as_str(), query.brand_id).await?;
    debug!("💻️ Checking the unimini lease of brand {} for user {}", query.brand_id, user.id);
    brands.check_unimini_expire(query.brand_id).await?;
    Ok(ApiResponse::ok(()))
}

//----------------------------------------------   Internal  ----------------------------------------------------
route!(inner_user_get => Get "/user/get" impl UserManagement, KeyValueStore);
pub async fn inner_user_get<B: UserManagement, C: KeyValueStore>(
    query: web::Query<UserIdQuery>,
    api: web::Data<UserApi<B, C>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    query.validate()?;
    trace!("💻️ Internal GET for user {}", query.user_id);
    let user = api.get_user_by_id(query.user_id).await?;
    Ok(ApiResponse::ok(InnerUserResponse::from(user)))
}

route!(wallet_get_by_cond => Get "/saas/walletgetbycond" impl WalletManagement);
pub async fn wallet_get_by_cond<B: WalletManagement>(
    query: web::Query<WalletCondQuery>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    query.validate()?;
    trace!("💻️ Internal wallet search: {}", query.conds);
    let wallets = api.get_by_cond(&query.fields, &query.conds).await?;
    Ok(ApiResponse::ok(wallets))
}

route!(wallet_get_single_by_cond => Get "/saas/walletgetsinglebycond" impl WalletManagement);
pub async fn wallet_get_single_by_cond<B: WalletManagement>(
    query: web::Query<WalletCondQuery>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    query.validate()?;
    trace!("💻️ Internal single wallet search: {}", query.conds);
    let wallet = api.get_single_by_cond(&query.fields, &query.conds).await?;
    Ok(ApiResponse::ok(wallet))
}

route!(wallet_get_single_by_id => Get "/saas/walletgetsinglebyid" impl WalletManagement);
pub async fn wallet_get_single_by_id<B: WalletManagement>(
    query: web::Query<WalletIdQuery>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    query.validate()?;
    trace!("💻️ Internal GET for wallet {}", query.id);
    let wallet = api.get_by_id(query.id).await?;
    Ok(ApiResponse::ok(wallet))
}

route!(wallet_edit_by_id_ex => Post "/saas/walleteditbyidex" impl WalletManagement);
pub async fn wallet_edit_by_id_ex<B: WalletManagement>(
    body: web::Json<WalletEditRequest>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let body = body.into_inner();
    body.validate()?;
    info!("💻️ Editing the balance of wallet {}: {}", body.id, body.balance);
    let rows_affected = api.edit_by_id_ex(body.id, &body.balance).await?;
    Ok(ApiResponse::ok(WalletEditResponse { rows_affected }))
}
