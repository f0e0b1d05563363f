use super::{rand_code, wallet::get_or_create_wallet, Service};
use crate::{
    auth::{hash_password, verify_password},
    now, Error, Result,
};
use entity::{login_record, profile, user, wallet::Kind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const REFERRAL_CODE_CHARS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Option<user::Role>,
    pub referral_code: Option<String>,
}

/// Editable user and profile fields, `None` keeps the current value.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

async fn unique_referral_code<C: ConnectionTrait>(conn: &C) -> Result<String> {
    for _ in 0..10 {
        let code = rand_code(REFERRAL_CODE_CHARS);
        let exists = user::Entity::find()
            .filter(user::Column::ReferralCode.eq(code.clone()))
            .one(conn)
            .await?
            .is_some();
        if !exists {
            return Ok(code);
        }
    }
    Err(Error::Str("could not allocate a referral code"))
}

impl Service {
    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(self.db()).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db())
            .await?)
    }

    pub async fn profile(&self, user_id: i32) -> Result<Option<profile::Model>> {
        Ok(profile::Entity::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(self.db())
            .await?)
    }

    /// Create a user with its profile, both wallets and referral links.
    pub async fn register(&self, reg: Registration) -> Result<user::Model> {
        let email = reg.email.trim().to_lowercase();
        if !valid_email(&email) {
            return Err(Error::invalid("Enter a valid email address"));
        }
        if reg.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(Error::invalid(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        if self.get_user_by_email(&email).await?.is_some() {
            return Err(Error::invalid("A user with that email already exists"));
        }
        let username = reg
            .username
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        if let Some(username) = &username {
            let taken = user::Entity::find()
                .filter(user::Column::Username.eq(username.clone()))
                .one(self.db())
                .await?
                .is_some();
            if taken {
                return Err(Error::invalid("That username is taken"));
            }
        }
        let referrer = match reg
            .referral_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(
                user::Entity::find()
                    .filter(user::Column::ReferralCode.eq(code))
                    .one(self.db())
                    .await?
                    .ok_or_else(|| Error::invalid("Invalid referral code"))?,
            ),
            None => None,
        };
        let role = match reg.role {
            // admins are never self registered
            Some(user::Role::Admin) | None => user::Role::Member,
            Some(role) => role,
        };
        let password = hash_password(&reg.password)?;

        let time = now() as i64;
        let txn = self.db().begin().await?;
        let code = unique_referral_code(&txn).await?;
        let user = user::ActiveModel {
            id: NotSet,
            email: Set(email),
            username: Set(username),
            password: Set(password),
            first_name: Set(reg.first_name.trim().to_owned()),
            last_name: Set(reg.last_name.trim().to_owned()),
            phone: Set(reg.phone),
            role: Set(role),
            is_active: Set(true),
            is_subscribed: Set(false),
            referral_code: Set(code),
            referred_by: Set(referrer.as_ref().map(|r| r.id)),
            last_login_at: Set(0),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        profile::ActiveModel {
            id: NotSet,
            user_id: Set(user.id),
            bio: Set(String::new()),
            country: Set(String::new()),
            state: Set(String::new()),
            city: Set(String::new()),
            created_at: Set(time),
            updated_at: Set(time),
        }
        .insert(&txn)
        .await?;
        get_or_create_wallet(&txn, user.id, Kind::Main).await?;
        get_or_create_wallet(&txn, user.id, Kind::Task).await?;
        if let Some(referrer) = &referrer {
            super::referral::link_referrals(&txn, referrer, &user).await?;
        }
        txn.commit().await?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Check credentials and record the login.
    pub async fn login(&self, email: &str, password: &str, ip: &str) -> Result<user::Model> {
        let user = self
            .get_user_by_email(email)
            .await?
            .ok_or(Error::Unauthorized)?;
        if !verify_password(password, &user.password) || !user.is_active {
            return Err(Error::Unauthorized);
        }
        let time = now() as i64;
        let txn = self.db().begin().await?;
        let user = user::ActiveModel {
            id: Set(user.id),
            last_login_at: Set(time),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        record_login(&txn, user.id, login_record::Action::Login, ip).await?;
        txn.commit().await?;
        Ok(user)
    }

    pub async fn logout(&self, user_id: i32, ip: &str) -> Result<()> {
        record_login(self.db(), user_id, login_record::Action::Logout, ip).await
    }

    pub async fn update_profile(
        &self,
        user: &user::Model,
        update: ProfileUpdate,
    ) -> Result<(user::Model, profile::Model)> {
        let time = now() as i64;
        let username = update
            .username
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        if let Some(username) = &username {
            let taken = user::Entity::find()
                .filter(user::Column::Username.eq(username.clone()))
                .filter(user::Column::Id.ne(user.id))
                .one(self.db())
                .await?
                .is_some();
            if taken {
                return Err(Error::invalid("That username is taken"));
            }
        }

        let mut model = user::ActiveModel {
            id: Set(user.id),
            updated_at: Set(time),
            ..Default::default()
        };
        if let Some(v) = update.first_name {
            model.first_name = Set(v);
        }
        if let Some(v) = update.last_name {
            model.last_name = Set(v);
        }
        if let Some(v) = update.phone {
            model.phone = Set(Some(v));
        }
        if let Some(v) = username {
            model.username = Set(Some(v));
        }

        let txn = self.db().begin().await?;
        let user = model.update(&txn).await?;
        let current = profile::Entity::find()
            .filter(profile::Column::UserId.eq(user.id))
            .one(&txn)
            .await?;
        let mut profile = match &current {
            Some(p) => profile::ActiveModel {
                id: Set(p.id),
                updated_at: Set(time),
                ..Default::default()
            },
            None => profile::ActiveModel {
                id: NotSet,
                user_id: Set(user.id),
                bio: Set(String::new()),
                country: Set(String::new()),
                state: Set(String::new()),
                city: Set(String::new()),
                created_at: Set(time),
                updated_at: Set(time),
            },
        };
        if let Some(v) = update.bio {
            profile.bio = Set(v);
        }
        if let Some(v) = update.country {
            profile.country = Set(v);
        }
        if let Some(v) = update.state {
            profile.state = Set(v);
        }
        if let Some(v) = update.city {
            profile.city = Set(v);
        }
        let profile = if current.is_some() {
            profile.update(&txn).await?
        } else {
            profile.insert(&txn).await?
        };
        txn.commit().await?;
        Ok((user, profile))
    }

    pub async fn set_role(&self, user_id: i32, role: user::Role) -> Result<user::Model> {
        Ok(user::ActiveModel {
            id: Set(user_id),
            role: Set(role),
            updated_at: Set(now() as i64),
            ..Default::default()
        }
        .update(self.db())
        .await?)
    }
}

async fn record_login<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    action: login_record::Action,
    ip: &str,
) -> Result<()> {
    login_record::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        action: Set(action),
        ip: Set(ip.to_owned()),
        created_at: Set(now() as i64),
    }
    .insert(conn)
    .await?;
    Ok(())
}
