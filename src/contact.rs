use axum::Extension;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::{Error, Fine, JsonBody};
use crate::models::ContactMessage;
use crate::store::{SharedStore, Store};
use crate::{required, Payload};

pub async fn submit_contact(store: &dyn Store, form: ContactForm) -> Result<Uuid, Error> {
    let contact = ContactMessage {
        uuid: Uuid::new_v4(),
        name: required(form.name, "name")?,
        email: required(form.email, "email")?,
        message: required(form.message, "message")?,
        submitted_at: Utc::now(),
    };
    store.insert_contact(&contact).await?;
    log::info!("Contact message {} from {}", contact.uuid, contact.email);
    Ok(contact.uuid)
}

pub async fn contact(
    Extension(store): Extension<SharedStore>,
    JsonBody(form): JsonBody<ContactForm>,
) -> Payload<ContactReceived> {
    let contact_id = submit_contact(store.as_ref(), form).await?;
    Ok(Fine(ContactReceived { contact_id }).with_message("Message submitted successfully!"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceived {
    contact_id: Uuid,
}
