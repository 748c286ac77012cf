// client.rs -- the slice of client session state the policy code reads

use ezq_common::q_shared::info_value_for_key;

/// Connection state, ordered from least to most connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnState {
    #[default]
    Disconnected,
    DemoStart,
    Connected,
    OnServer,
    Active,
}

#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub state: ConnState,
    pub spectator: bool,
    /// Server is waiting for players to ready up.
    pub standby: bool,
    pub demoplayback: bool,
    pub mvdplayback: bool,
    /// `cl_multiview` is on.
    pub multiview: bool,
    pub num_views: u32,
    pub serverinfo: String,
    /// Highest fullbright-skin fraction the server allows.
    pub fbskins: f32,
    pub allow_cheats: bool,
    pub servername: String,
}

impl ClientState {
    pub fn is_disconnected(&self) -> bool {
        self.state == ConnState::Disconnected
    }

    pub fn is_connected(&self) -> bool {
        self.state >= ConnState::Connected
    }

    /// The server reports remaining match time ("status" = "N min left").
    pub fn match_in_progress(&self) -> bool {
        info_value_for_key(&self.serverinfo, "status").contains("left")
    }
}

/// Services owned elsewhere in the client that policy changes poke.
pub trait ClientHooks {
    /// Drop cached models/textures so ruleset-dependent content reloads.
    fn cache_flush(&mut self);

    /// Re-expand user macros; the variables they reference may have changed.
    fn reinit_all_macros(&mut self);

    /// Append text to the command buffer (chat announcements are `say` lines).
    fn cbuf_add_text(&mut self, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_state_ordering() {
        assert!(ConnState::Active > ConnState::Connected);
        assert!(ConnState::DemoStart < ConnState::Connected);
        let mut cl = ClientState::default();
        assert!(cl.is_disconnected());
        cl.state = ConnState::OnServer;
        assert!(cl.is_connected());
        cl.state = ConnState::DemoStart;
        assert!(!cl.is_connected() && !cl.is_disconnected());
    }

    #[test]
    fn test_match_in_progress() {
        let mut cl = ClientState::default();
        assert!(!cl.match_in_progress());
        cl.serverinfo = "\\status\\Standby".to_string();
        assert!(!cl.match_in_progress());
        cl.serverinfo = "\\maxclients\\8\\status\\12 min left".to_string();
        assert!(cl.match_in_progress());
    }
}
