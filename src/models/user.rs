use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// A `CreateUser` whose required fields are all present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CreateUser {
    pub fn validate(self) -> Option<NewUser> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        Some(NewUser {
            name: present(self.name)?,
            email: present(self.email)?,
            password: present(self.password)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: Option<&str>, email: Option<&str>, password: Option<&str>) -> CreateUser {
        CreateUser {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn complete_body_validates() {
        let user = body(Some("Ana"), Some("ana@example.com"), Some("secret"))
            .validate()
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
    }

    #[test]
    fn missing_or_empty_fields_fail() {
        assert!(body(None, Some("a@b.c"), Some("x")).validate().is_none());
        assert!(body(Some("Ana"), Some(""), Some("x")).validate().is_none());
        assert!(body(Some("Ana"), Some("a@b.c"), None).validate().is_none());
    }
}
