// Device identity parsing

/// Identity of a stored series, split into its device and optional channel.
///
/// Multi-channel devices store each channel under `"<device>/<index>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceChannelId {
    pub id: String,
    pub channel: Option<u32>,
}

impl DeviceChannelId {
    pub fn parse(raw: &str) -> Self {
        if let Some((base, index)) = raw.split_once('/') {
            let composite = !base.is_empty()
                && !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit());
            if composite {
                if let Ok(channel) = index.parse::<u32>() {
                    return Self {
                        id: base.to_string(),
                        channel: Some(channel),
                    };
                }
            }
        }

        Self {
            id: raw.to_string(),
            channel: None,
        }
    }

    pub fn is_channel(&self) -> bool {
        self.channel.is_some()
    }
}

/// Check an identity supplied by a caller before it reaches a storage query
pub fn is_valid_device_id(id: &str) -> bool {
    !id.is_empty()
        && !id
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '"' || c == '\\')
}
