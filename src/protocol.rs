//! Wire format of the note channel.
//!
//! Every message in either direction is a JSON object carrying a `method`
//! discriminator. Requests may also carry an opaque `request_id`, which is
//! echoed unchanged on the reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Note, NoteId};

/// Why an incoming message could not be routed.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Message is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message has no method")]
    MissingMethod,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid {method} request: {source}")]
    Invalid {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// `POST` body. Absent required fields are reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: Option<i64>,
    pub changed: Option<i64>,
}

/// `EDIT` body. `tags: None` leaves the note's tags as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditNote {
    pub id: Option<NoteId>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub changed: Option<i64>,
}

/// `DELETE` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteNote {
    pub id: Option<NoteId>,
}

/// `SEARCH` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchNotes {
    pub text: Option<String>,
}

/// A routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Create(CreateNote),
    List,
    Edit(EditNote),
    Delete(DeleteNote),
    Search(SearchNotes),
}

impl Request {
    /// The verb this request arrived with.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Create(_) => "POST",
            Request::List => "GET",
            Request::Edit(_) => "EDIT",
            Request::Delete(_) => "DELETE",
            Request::Search(_) => "SEARCH",
        }
    }
}

/// A decoded request with its optional correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub request_id: Option<Value>,
    pub request: Request,
}

impl Envelope {
    /// Decodes one text message.
    ///
    /// # Examples
    ///
    /// ```
    /// use notesock::protocol::{Envelope, Request};
    ///
    /// let envelope = Envelope::decode(r#"{"method": "GET"}"#).unwrap();
    /// assert_eq!(envelope.request, Request::List);
    /// assert!(envelope.request_id.is_none());
    /// ```
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let method = object
            .get("method")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingMethod)?;
        let request_id = object.get("request_id").cloned();

        let request = match method {
            "POST" => Request::Create(body("POST", &value)?),
            "GET" => Request::List,
            "EDIT" => Request::Edit(body("EDIT", &value)?),
            "DELETE" => Request::Delete(body("DELETE", &value)?),
            "SEARCH" => Request::Search(body("SEARCH", &value)?),
            other => return Err(ProtocolError::UnknownMethod(other.to_string())),
        };

        Ok(Self {
            request_id,
            request,
        })
    }
}

fn body<T: DeserializeOwned>(method: &'static str, value: &Value) -> Result<T, ProtocolError> {
    T::deserialize(value).map_err(|source| ProtocolError::Invalid { method, source })
}

/// Reply payload, tagged with the verb of the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Response {
    #[serde(rename = "POST_BACK")]
    PostBack(Note),
    #[serde(rename = "GET_BACK")]
    GetBack { note_list: Vec<Note> },
    #[serde(rename = "EDIT_BACK")]
    EditBack,
    #[serde(rename = "DELETE_BACK")]
    DeleteBack,
    #[serde(rename = "SEARCH_BACK")]
    SearchBack { note_list: Vec<Note> },
}

/// A response plus the correlation id of the request, if it had one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(flatten)]
    pub response: Response,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
}

impl Reply {
    pub fn new(response: Response, request_id: Option<Value>) -> Self {
        Self {
            response,
            request_id,
        }
    }

    /// Encodes the reply as one text message.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
