use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub db_password: SecretString,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(mail_from: String) -> Self {
        Self {
            db_password: SecretString::default(),
            mail_relay_url: None,
            mail_from,
        }
    }

    pub fn set_db_password(&mut self, password: SecretString) {
        self.db_password = password;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new("no-reply@nido.family".to_string());
        assert_eq!(args.mail_from, "no-reply@nido.family");
        assert_eq!(args.mail_relay_url, None);
        assert_eq!(args.db_password.expose_secret(), "");
    }

    #[test]
    fn test_set_db_password() {
        let mut args = GlobalArgs::new("no-reply@nido.family".to_string());
        args.set_db_password(SecretString::from("hunter2".to_string()));
        assert_eq!(args.db_password.expose_secret(), "hunter2");
    }
}
