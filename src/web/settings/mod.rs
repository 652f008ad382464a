//! Account settings page: profile name, password, photo and account deletion.
//! Every operation ends in a [`Notice`]; nothing here returns an error to the
//! page.

pub mod photo_upload;

use self::photo_upload::{ImageFile, PhotoUpload, UploadError, Uploader};
use super::{
    auth::{
        flows::validate_new_password,
        guards::{GuardView, Navigator, SessionGuard, SessionSnapshot},
        types::{ChangePasswordRequest, DeleteUserRequest, UpdateUserRequest},
        AuthClient,
    },
    errors::AppError,
};
use crate::web::pages::HOME_PATH;
use tracing::{error, info};

pub const SETTINGS_PATH: &str = "/settings";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Stores the photo as a data URI on the user record.
#[derive(Clone, Debug)]
pub struct ProfileImageUploader {
    client: AuthClient,
}

impl ProfileImageUploader {
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }
}

impl Uploader for ProfileImageUploader {
    async fn upload(&self, file: &ImageFile) -> Result<(), AppError> {
        let request = UpdateUserRequest {
            name: None,
            image: Some(file.data_uri()),
        };
        self.client.update_user(&request).await
    }
}

pub struct SettingsPage {
    client: AuthClient,
    guard: SessionGuard,
    photo: PhotoUpload<ProfileImageUploader>,
}

impl SettingsPage {
    /// `image` is the photo currently stored for the user.
    #[must_use]
    pub fn new(client: AuthClient, image: Option<String>) -> Self {
        let photo = PhotoUpload::new(ProfileImageUploader::new(client.clone()), image);
        Self {
            client,
            guard: SessionGuard::new(SETTINGS_PATH),
            photo,
        }
    }

    #[must_use]
    pub fn render<'a>(&self, snapshot: &'a SessionSnapshot) -> GuardView<'a> {
        self.guard.render(snapshot)
    }

    pub fn sync(&mut self, snapshot: &SessionSnapshot, navigator: &mut impl Navigator) -> bool {
        self.guard.sync(snapshot, navigator)
    }

    #[must_use]
    pub fn photo(&self) -> &PhotoUpload<ProfileImageUploader> {
        &self.photo
    }

    pub async fn update_profile(&self, name: &str) -> Notice {
        let request = UpdateUserRequest {
            name: Some(name.trim().to_string()),
            image: None,
        };
        match self.client.update_user(&request).await {
            Ok(()) => Notice::Success("Profile updated successfully".to_string()),
            Err(err) => {
                error!("Failed to update profile: {err}");
                Notice::Error(err.user_message("Failed to update profile"))
            }
        }
    }

    /// Changes the password and signs out every other session.
    pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> Notice {
        if let Err(err) = validate_new_password(new, confirm) {
            return Notice::Error(err.to_string());
        }

        let request = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
            revoke_other_sessions: true,
        };
        match self.client.change_password(&request).await {
            Ok(()) => Notice::Success("Password updated successfully".to_string()),
            Err(err) => {
                error!("Failed to update password: {err}");
                Notice::Error(err.user_message("Failed to update password"))
            }
        }
    }

    pub async fn upload_photo(&mut self, file: ImageFile) -> Notice {
        match self.photo.select(file).await {
            Ok(()) => Notice::Success("Photo uploaded successfully".to_string()),
            Err(UploadError::Upload(err)) => Notice::Error(err.user_message("Failed to upload photo")),
            Err(err) => Notice::Error(err.to_string()),
        }
    }

    pub fn remove_photo(&mut self) {
        self.photo.remove();
    }

    /// Deletes the account once the user has confirmed, then leaves for the
    /// home page. Returns `None` when there is nothing to report.
    pub async fn delete_account(
        &self,
        confirmed: bool,
        navigator: &mut impl Navigator,
    ) -> Option<Notice> {
        if !confirmed {
            return None;
        }

        let request = DeleteUserRequest {
            callback_url: Some(HOME_PATH.to_string()),
        };
        match self.client.delete_user(&request).await {
            Ok(()) => {
                info!("account deleted");
                navigator.push(HOME_PATH);
                None
            }
            Err(err) => {
                error!("Failed to delete account: {err}");
                Some(Notice::Error(err.user_message("Failed to delete account")))
            }
        }
    }
}
