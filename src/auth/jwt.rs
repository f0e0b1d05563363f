use crate::{auth::AuthError, now, AppState, Error, Result};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use entity::{subscription, user};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin};

#[derive(Serialize, Deserialize, Debug)]
pub struct JwtToken {
    // issued at
    pub iat: i64,
    // expiration
    pub exp: i64,
    // data
    pub user_id: i32,
}

impl JwtToken {
    pub fn from_str(token: &str, secret: &[u8]) -> Result<Self, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Ok(
            jsonwebtoken::decode::<JwtToken>(
                token,
                &DecodingKey::from_secret(secret),
                &validation,
            )?
            .claims,
        )
    }

    pub fn generate(user_id: i32, expiry: usize, secret: &[u8]) -> Result<String, AuthError> {
        let now = now() as i64;
        let payload = JwtToken {
            iat: now,
            exp: now + expiry as i64,
            user_id,
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(secret),
        )?)
    }
}

fn bearer(req: &HttpRequest) -> Option<String> {
    let auth = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    if auth.starts_with("bearer") || auth.starts_with("Bearer") {
        Some(auth[6..auth.len()].trim().to_owned())
    } else {
        None
    }
}

#[derive(Debug)]
pub struct AuthedUser {
    pub user: user::Model,
}

impl AuthedUser {
    pub async fn from_token(token: &str, state: &AppState) -> Result<Self, Error> {
        let token = JwtToken::from_str(token, state.setting.auth.secret.as_bytes())?;
        let user = state
            .service
            .get_user_by_id(token.user_id)
            .await?
            .ok_or(AuthError::Invalid("unknown user"))?;
        if !user.is_active {
            return Err(Error::Unauthorized);
        }
        Ok(Self { user })
    }
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<AuthedUser>>>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            if let Some(state) = req.app_data::<web::Data<AppState>>() {
                if let Some(token) = bearer(&req) {
                    return AuthedUser::from_token(&token, state).await;
                }
            }
            Err(AuthError::Invalid("missing auth token").into())
        })
    }
}

/// Authed user with the admin role.
#[derive(Debug)]
pub struct AdminUser {
    pub user: user::Model,
}

impl TryFrom<AuthedUser> for AdminUser {
    type Error = Error;
    fn try_from(authed: AuthedUser) -> Result<Self> {
        if authed.user.role == user::Role::Admin {
            Ok(AdminUser { user: authed.user })
        } else {
            Err(Error::Forbidden("Admin only"))
        }
    }
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<AdminUser>>>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let fut = AuthedUser::from_request(req, pl);
        Box::pin(async move { AdminUser::try_from(fut.await?) })
    }
}

/// Authed user holding an active subscription.
#[derive(Debug)]
pub struct Subscriber {
    pub user: user::Model,
    pub subscription: subscription::Model,
}

impl FromRequest for Subscriber {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Subscriber>>>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let fut = AuthedUser::from_request(req, pl);
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let authed = fut.await?;
            let state = state.ok_or(Error::Str("missing app state"))?;
            let subscription = state
                .service
                .active_subscription(authed.user.id)
                .await?
                .ok_or(Error::SubscriptionRequired)?;
            Ok(Subscriber {
                user: authed.user,
                subscription,
            })
        })
    }
}
