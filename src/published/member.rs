use time::OffsetDateTime;

use crate::domain::content::MemberEntity;

use super::content::PublishedContent;

/// Published view of a member: its content view plus account fields.
#[derive(Debug, Clone)]
pub struct PublishedMember {
    content: PublishedContent,
    email: String,
    username: String,
    comments: Option<String>,
    is_approved: bool,
    is_locked_out: bool,
    last_lockout_date: Option<OffsetDateTime>,
    last_login_date: Option<OffsetDateTime>,
    last_password_change_date: Option<OffsetDateTime>,
}

impl PublishedMember {
    pub(crate) fn new(content: PublishedContent, member: &MemberEntity) -> Self {
        Self {
            content,
            email: member.email.clone(),
            username: member.username.clone(),
            comments: member.comments.clone(),
            is_approved: member.is_approved,
            is_locked_out: member.is_locked_out,
            last_lockout_date: member.last_lockout_date,
            last_login_date: member.last_login_date,
            last_password_change_date: member.last_password_change_date,
        }
    }

    pub fn content(&self) -> &PublishedContent {
        &self.content
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved
    }

    pub fn is_locked_out(&self) -> bool {
        self.is_locked_out
    }

    pub fn last_lockout_date(&self) -> Option<OffsetDateTime> {
        self.last_lockout_date
    }

    pub fn last_login_date(&self) -> Option<OffsetDateTime> {
        self.last_login_date
    }

    pub fn last_password_change_date(&self) -> Option<OffsetDateTime> {
        self.last_password_change_date
    }
}
