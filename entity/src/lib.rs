pub mod chat_message;
pub mod chat_room;
pub mod dispute;
pub mod escrow;
pub mod login_record;
pub mod payment;
pub mod payment_detail;
pub mod payment_gateway;
pub mod plan;
pub mod profile;
pub mod record;
pub mod referral;
pub mod referral_earning;
pub mod submission;
pub mod subscription;
pub mod task;
pub mod user;
pub mod wallet;
pub mod webhook_event;
pub mod withdrawal;
