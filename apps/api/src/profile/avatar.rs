//! Avatar storage boundary.
//!
//! `AssetUploader` is the only way the engine reaches object storage. The
//! default backend writes to S3 / MinIO and hands back a public URL.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::profile::models::PendingAvatar;

pub const DEFAULT_MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Stores an avatar binary and returns a reference that can be rendered later.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn store(&self, user_id: Uuid, avatar: &PendingAvatar) -> Result<String>;
}

pub struct S3AvatarUploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3AvatarUploader {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl AssetUploader for S3AvatarUploader {
    async fn store(&self, user_id: Uuid, avatar: &PendingAvatar) -> Result<String> {
        let key = avatar_object_key(user_id, avatar, Utc::now().timestamp_millis());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(avatar.bytes.clone()))
            .content_type(&avatar.content_type)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded avatar to s3://{}/{}", self.bucket, key);

        Ok(format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            key
        ))
    }
}

/// Checks that a candidate avatar is a non-empty image within the size limit.
pub fn validate_avatar(avatar: &PendingAvatar, max_bytes: usize) -> Result<(), String> {
    if !avatar.content_type.starts_with("image/") {
        return Err(format!(
            "Avatar must be an image, got '{}'",
            avatar.content_type
        ));
    }
    if avatar.bytes.is_empty() {
        return Err("Avatar file is empty".to_string());
    }
    if avatar.bytes.len() > max_bytes {
        return Err(format!(
            "Avatar is {} bytes; the limit is {max_bytes}",
            avatar.bytes.len()
        ));
    }
    Ok(())
}

/// Data URI shown while the avatar is still pending.
pub fn preview_data_uri(avatar: &PendingAvatar) -> String {
    format!(
        "data:{};base64,{}",
        avatar.content_type,
        BASE64_STANDARD.encode(&avatar.bytes)
    )
}

/// `avatars/{user_id}/{millis}.{ext}`
pub fn avatar_object_key(user_id: Uuid, avatar: &PendingAvatar, millis: i64) -> String {
    format!("avatars/{user_id}/{millis}.{}", file_extension(avatar))
}

fn file_extension(avatar: &PendingAvatar) -> String {
    let from_name = avatar
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match avatar.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
        .to_string()
    })
}
