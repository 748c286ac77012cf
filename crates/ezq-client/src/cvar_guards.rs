// cvar_guards.rs -- on-change hooks for competition-sensitive variables
//
// Players are told what their opponents use: changing one of these while
// connected (and not spectating) announces the new setting in chat.

use ezq_common::common::com_printf;
use ezq_common::cvar::{ChangeVerdict, CvarContext, CvarGuard};
use ezq_common::q_shared::{bound, q_atof, q_atoi};

use crate::client::{ClientHooks, ClientState};
use crate::rulesets::Rulesets;

fn announces(client: &ClientState) -> bool {
    !client.spectator && !client.is_disconnected()
}

fn locked_by_match(client: &ClientState) -> bool {
    client.is_connected() && client.match_in_progress() && !client.spectator
}

pub fn on_change_indphys(client: &ClientState, name: &str) -> ChangeVerdict {
    if !client.is_disconnected() {
        com_printf(&format!("{} can be changed only in disconnected mode\n", name));
        return ChangeVerdict::Reject;
    }
    ChangeVerdict::Accept
}

pub fn on_change_fullbright_skins(
    client: &ClientState,
    hooks: &mut dyn ClientHooks,
    value: &str,
) -> ChangeVerdict {
    let fbskins = bound(0.0, q_atof(value), client.fbskins);

    if announces(client) {
        if fbskins > 0.0 {
            hooks.cbuf_add_text(&format!("say all skins {}% fullbright\n", (fbskins * 100.0) as i32));
        } else {
            hooks.cbuf_add_text("say not using fullbright skins\n");
        }
    }
    ChangeVerdict::Accept
}

pub fn on_change_allow_scripts(
    client: &ClientState,
    hooks: &mut dyn ClientHooks,
    name: &str,
    value: &str,
) -> ChangeVerdict {
    if locked_by_match(client) {
        com_printf(&format!("{} changes are not allowed during the match.\n", name));
        return ChangeVerdict::Reject;
    }

    if announces(client) {
        let text = match q_atoi(value) {
            i32::MIN..=0 => "say not using scripts\n",
            1 => "say using simple scripts\n",
            _ => "say using advanced scripts\n",
        };
        hooks.cbuf_add_text(text);
    }
    ChangeVerdict::Accept
}

pub fn on_change_fakeshaft(
    client: &ClientState,
    hooks: &mut dyn ClientHooks,
    name: &str,
    value: &str,
) -> ChangeVerdict {
    if locked_by_match(client) {
        com_printf(&format!("{} changes are not allowed during the match.\n", name));
        return ChangeVerdict::Reject;
    }

    if announces(client) {
        let fakeshaft = q_atof(value);
        if fakeshaft > 0.999 {
            hooks.cbuf_add_text("say fakeshaft on\n");
        } else if fakeshaft < 0.001 {
            hooks.cbuf_add_text("say fakeshaft off\n");
        } else {
            hooks.cbuf_add_text(&format!("say fakeshaft {:.1}%\n", fakeshaft * 100.0));
        }
    }
    ChangeVerdict::Accept
}

/// Routes console assignments to the hook registered for each variable.
pub struct ClientGuards<'a> {
    pub rulesets: &'a mut Rulesets,
    pub client: &'a ClientState,
    pub hooks: &'a mut dyn ClientHooks,
}

impl CvarGuard for ClientGuards<'_> {
    fn on_change(&mut self, cvars: &mut CvarContext, name: &str, value: &str) -> ChangeVerdict {
        match name {
            "ruleset" => self.rulesets.on_change_ruleset(cvars, self.client, &mut *self.hooks, value),
            "cl_independentPhysics" => on_change_indphys(self.client, name),
            "r_fullbrightSkins" => on_change_fullbright_skins(self.client, &mut *self.hooks, value),
            "allow_scripts" => on_change_allow_scripts(self.client, &mut *self.hooks, name, value),
            "cl_fakeshaft" => on_change_fakeshaft(self.client, &mut *self.hooks, name, value),
            _ => ChangeVerdict::Accept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnState;
    use crate::rulesets::Ruleset;
    use ezq_common::common::{com_begin_redirect, com_end_redirect};
    use ezq_common::cvar::CvarFlags;

    #[derive(Default)]
    struct Chat {
        lines: Vec<String>,
    }

    impl ClientHooks for Chat {
        fn cache_flush(&mut self) {}
        fn reinit_all_macros(&mut self) {}
        fn cbuf_add_text(&mut self, text: &str) {
            self.lines.push(text.to_string());
        }
    }

    fn playing() -> ClientState {
        ClientState { state: ConnState::Active, fbskins: 1.0, ..Default::default() }
    }

    fn in_match() -> ClientState {
        ClientState { serverinfo: "\\status\\5 min left".to_string(), ..playing() }
    }

    #[test]
    fn test_indphys_only_while_disconnected() {
        assert!(on_change_indphys(&ClientState::default(), "cl_independentPhysics").is_accepted());

        com_begin_redirect();
        let verdict = on_change_indphys(&playing(), "cl_independentPhysics");
        let out = com_end_redirect();
        assert_eq!(verdict, ChangeVerdict::Reject);
        assert_eq!(out, "cl_independentPhysics can be changed only in disconnected mode\n");
    }

    #[test]
    fn test_fullbright_skins_announced_and_clamped() {
        let mut chat = Chat::default();
        let client = ClientState { fbskins: 0.5, ..playing() };

        assert!(on_change_fullbright_skins(&client, &mut chat, "1").is_accepted());
        assert!(on_change_fullbright_skins(&client, &mut chat, "0.25").is_accepted());
        assert!(on_change_fullbright_skins(&client, &mut chat, "0").is_accepted());
        assert_eq!(
            chat.lines,
            [
                "say all skins 50% fullbright\n",
                "say all skins 25% fullbright\n",
                "say not using fullbright skins\n",
            ]
        );
    }

    #[test]
    fn test_spectators_stay_quiet() {
        let mut chat = Chat::default();
        let client = ClientState { spectator: true, ..in_match() };
        assert!(on_change_fullbright_skins(&client, &mut chat, "1").is_accepted());
        assert!(on_change_allow_scripts(&client, &mut chat, "allow_scripts", "2").is_accepted());
        assert!(on_change_fakeshaft(&client, &mut chat, "cl_fakeshaft", "1").is_accepted());
        assert!(chat.lines.is_empty());

        let client = ClientState::default();
        assert!(on_change_fakeshaft(&client, &mut chat, "cl_fakeshaft", "1").is_accepted());
        assert!(chat.lines.is_empty());
    }

    #[test]
    fn test_allow_scripts_levels() {
        let mut chat = Chat::default();
        for v in ["0", "1", "2", "-3"] {
            on_change_allow_scripts(&playing(), &mut chat, "allow_scripts", v);
        }
        assert_eq!(
            chat.lines,
            [
                "say not using scripts\n",
                "say using simple scripts\n",
                "say using advanced scripts\n",
                "say not using scripts\n",
            ]
        );
    }

    #[test]
    fn test_match_blocks_script_and_fakeshaft_changes() {
        let mut chat = Chat::default();

        com_begin_redirect();
        let a = on_change_allow_scripts(&in_match(), &mut chat, "allow_scripts", "2");
        let b = on_change_fakeshaft(&in_match(), &mut chat, "cl_fakeshaft", "0");
        let out = com_end_redirect();

        assert_eq!(a, ChangeVerdict::Reject);
        assert_eq!(b, ChangeVerdict::Reject);
        assert!(out.contains("allow_scripts changes are not allowed during the match."));
        assert!(out.contains("cl_fakeshaft changes are not allowed during the match."));
        assert!(chat.lines.is_empty());
    }

    #[test]
    fn test_fakeshaft_messages() {
        let mut chat = Chat::default();
        for v in ["1", "0", "0.5"] {
            on_change_fakeshaft(&playing(), &mut chat, "cl_fakeshaft", v);
        }
        assert_eq!(
            chat.lines,
            ["say fakeshaft on\n", "say fakeshaft off\n", "say fakeshaft 50.0%\n"]
        );
    }

    #[test]
    fn test_client_guards_route_by_name() {
        let mut cvars = CvarContext::new();
        cvars.register("ruleset", "default", CvarFlags::empty());
        cvars.register("cl_independentPhysics", "0", CvarFlags::empty());
        cvars.register("cl_fakeshaft", "1", CvarFlags::empty());
        cvars.register("name", "player", CvarFlags::empty());

        let mut rulesets = Rulesets::new();
        let mut chat = Chat::default();
        let client = ClientState::default();

        let mut guards = ClientGuards { rulesets: &mut rulesets, client: &client, hooks: &mut chat };
        assert!(cvars.set_guarded("ruleset", "smackdown", &mut guards).is_accepted());
        assert!(cvars.set_guarded("cl_independentPhysics", "1", &mut guards).is_accepted());
        assert_eq!(cvars.set_guarded("ruleset", "nope", &mut guards), ChangeVerdict::Reject);
        assert!(cvars.set_guarded("name", "other", &mut guards).is_accepted());

        assert_eq!(rulesets.current(), Ruleset::Smackdown);
        assert_eq!(cvars.variable_string("ruleset"), "smackdown");
        assert_eq!(cvars.variable_string("cl_independentPhysics"), "1");
        assert_eq!(cvars.variable_string("name"), "other");

        let client = in_match();
        let mut guards = ClientGuards { rulesets: &mut rulesets, client: &client, hooks: &mut chat };
        assert_eq!(cvars.set_guarded("cl_fakeshaft", "0", &mut guards), ChangeVerdict::Reject);
        assert_eq!(cvars.set_guarded("ruleset", "default", &mut guards), ChangeVerdict::Reject);
        assert_eq!(cvars.variable_string("cl_fakeshaft"), "1");
    }
}
