macro_rules! live {
    ($id:expr) => {
        $crate::models::ChannelStatus {
            is_live: true,
            stream_id: $id.to_string(),
            title: format!("title of {}", $id),
            thumbnail_url: format!("http://thumbnail.test/{}.jpg", $id),
        }
    };
}

macro_rules! offline {
    () => {
        $crate::models::ChannelStatus::default()
    };
}

// Builds `ChannelStatuses` in the given order.
macro_rules! statuses {
    ($($name:expr => $status:expr),* $(,)?) => {{
        let mut _statuses = $crate::models::ChannelStatuses::new();
        $(
            let _ = _statuses.insert($name.to_string(), $status);
        )*
        _statuses
    }};
}
