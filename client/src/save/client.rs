use super::snapshot::{LoadResponse, SaveRequest, SaveResponse, SaveSnapshot};
use super::{LoadError, SaveError, SaveStore};

/// Blocking HTTP client for the remote save endpoint
pub struct SaveClient {
    base_url: String,
    token: String,
}

impl SaveClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl SaveStore for SaveClient {
    /// POST the snapshot to `/api/save`
    fn save(&self, snapshot: &SaveSnapshot) -> Result<(), SaveError> {
        let url = format!("{}/api/save", self.base_url);

        let response = ureq::post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &self.bearer())
            .send_json(SaveRequest {
                game_state: snapshot,
            })
            .map_err(|e| match e {
                ureq::Error::Status(401, _) => SaveError::Unauthorized,
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    SaveError::Server(format!("HTTP {}: {}", code, body))
                }
                other => SaveError::Network(other.to_string()),
            })?;

        let save_resp: SaveResponse = response
            .into_json()
            .map_err(|e| SaveError::Network(e.to_string()))?;

        if save_resp.success {
            Ok(())
        } else {
            Err(SaveError::Server(
                save_resp.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }

    /// GET `/api/load`; `Ok(None)` when the account has no save yet
    fn load(&self) -> Result<Option<SaveSnapshot>, LoadError> {
        let url = format!("{}/api/load", self.base_url);

        let response = ureq::get(&url)
            .set("Authorization", &self.bearer())
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(401, _) => LoadError::Unauthorized,
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    LoadError::Server(format!("HTTP {}: {}", code, body))
                }
                other => LoadError::Network(other.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        let load_resp: LoadResponse =
            serde_json::from_str(&body).map_err(|e| LoadError::Decode(e.to_string()))?;

        Ok(load_resp.game_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = SaveClient::new("http://localhost:2567/", "abc");
        assert_eq!(client.base_url, "http://localhost:2567");
        assert_eq!(client.bearer(), "Bearer abc");
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on any sane test host
        let client = SaveClient::new("http://127.0.0.1:9", "abc");
        assert!(matches!(client.load(), Err(LoadError::Network(_))));
    }
}
