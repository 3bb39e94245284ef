use serenity::http::Http;
use serenity::model::guild::{Member, Role};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::utils::Colour;
use std::collections::{HashMap, HashSet};

/** Discord caps a single member list request at this many entries. */
const MEMBER_PAGE_LIMIT: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    pub colour: Colour,
}

impl From<Role> for RoleInfo {
    fn from(role: Role) -> Self {
        RoleInfo {
            id: role.id,
            name: role.name,
            colour: role.colour,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: UserId,
    pub display_name: String,
    pub roles: Vec<RoleId>,
}

impl From<Member> for MemberInfo {
    fn from(member: Member) -> Self {
        MemberInfo {
            id: member.user.id,
            display_name: member.display_name().into_owned(),
            roles: member.roles,
        }
    }
}

/// A point-in-time view of one guild's channels, roles and members.
///
/// Tracked state only ever stores IDs; this is what resolves them. An ID that is
/// missing here is stale and gets pruned by the caller.
#[derive(Debug)]
pub struct GuildDirectory {
    guild_id: GuildId,
    channels: HashSet<ChannelId>,
    roles: HashMap<RoleId, RoleInfo>,
    members: Vec<MemberInfo>,
}

impl GuildDirectory {
    pub fn new(
        guild_id: GuildId,
        channels: impl IntoIterator<Item = ChannelId>,
        roles: impl IntoIterator<Item = RoleInfo>,
        members: impl IntoIterator<Item = MemberInfo>,
    ) -> GuildDirectory {
        GuildDirectory {
            guild_id,
            channels: channels.into_iter().collect(),
            roles: roles.into_iter().map(|role| (role.id, role)).collect(),
            members: members.into_iter().collect(),
        }
    }

    /** Fetches channels and roles of a guild, plus its whole member list if `with_members` is set. */
    pub async fn fetch(
        http: impl AsRef<Http>,
        guild_id: GuildId,
        with_members: bool,
    ) -> serenity::Result<GuildDirectory> {
        let http = http.as_ref();
        let channels = guild_id.channels(http).await?.into_keys();
        let roles = guild_id.roles(http).await?.into_values().map(RoleInfo::from);
        let mut members = Vec::new();
        if with_members {
            let mut after: Option<UserId> = None;
            loop {
                let page = guild_id.members(http, Some(MEMBER_PAGE_LIMIT), after).await?;
                let page_len = page.len() as u64;
                after = page.last().map(|member| member.user.id);
                members.extend(page.into_iter().map(MemberInfo::from));
                if page_len < MEMBER_PAGE_LIMIT {
                    break;
                }
            }
        }
        Ok(GuildDirectory::new(guild_id, channels, roles, members))
    }

    pub fn has_channel(&self, channel_id: ChannelId) -> bool {
        self.channels.contains(&channel_id)
    }

    pub fn role(&self, role_id: RoleId) -> Option<&RoleInfo> {
        self.roles.get(&role_id)
    }

    /// Members holding the role, ordered by display name (case-insensitive), then user ID.
    ///
    /// The `@everyone` role shares the guild's ID and never shows up in a member's
    /// role list, so it resolves to every member.
    pub fn role_members(&self, role_id: RoleId) -> Vec<&MemberInfo> {
        let everyone = role_id.0 == self.guild_id.0;
        let mut members: Vec<&MemberInfo> = self
            .members
            .iter()
            .filter(|member| everyone || member.roles.contains(&role_id))
            .collect();
        members.sort_by_cached_key(|member| (member.display_name.to_lowercase(), member.id));
        members
    }
}
