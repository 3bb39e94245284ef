use itertools::Itertools;
use serenity::model::id::{RoleId, UserId};
use serenity::utils::Colour;
use std::collections::HashSet;

use crate::client::tracking::directory::{GuildDirectory, MemberInfo, RoleInfo};

pub const MEMBERS_PER_PAGE: usize = 15;
pub const MAX_NAME_LENGTH: usize = 30;
/** Role titles are left-aligned and padded to this many characters. */
pub const TITLE_WIDTH: usize = 20;
pub const SUMMARY_TITLE: &str = "Total";

/** A tracked role together with the members currently holding it. */
#[derive(Debug, Clone)]
pub struct RoleMembers {
    pub role: RoleInfo,
    pub members: Vec<MemberInfo>,
}

/** One embed worth of roster output. */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterUnit {
    pub title: String,
    pub description: String,
    pub colour: Colour,
}

/** Resolves tracked roles against a directory. Roles that no longer exist are returned separately. */
pub fn gather(directory: &GuildDirectory, tracked: &[RoleId]) -> (Vec<RoleMembers>, Vec<RoleId>) {
    let mut resolved = Vec::new();
    let mut stale = Vec::new();
    for role_id in tracked {
        match directory.role(*role_id) {
            Some(role) => resolved.push(RoleMembers {
                role: role.clone(),
                members: directory
                    .role_members(*role_id)
                    .into_iter()
                    .cloned()
                    .collect(),
            }),
            None => stale.push(*role_id),
        }
    }
    (resolved, stale)
}

pub fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_LENGTH {
        let mut truncated: String = name.chars().take(MAX_NAME_LENGTH).collect();
        truncated.push_str("...");
        truncated
    } else {
        name.to_owned()
    }
}

/// Builds the roster for a channel.
///
/// Each member is listed once, under the first role (in tracked order) they hold.
/// Every role yields one unit per page of lines; a final unit carries the number of
/// distinct members listed.
pub fn compile(roles: &[RoleMembers]) -> Vec<RosterUnit> {
    let mut counted: HashSet<UserId> = HashSet::new();
    let mut units = Vec::new();

    for entry in roles {
        let fresh: Vec<&MemberInfo> = entry
            .members
            .iter()
            .filter(|member| counted.insert(member.id))
            .collect();
        let numbered = fresh.len() > 1;
        let lines: Vec<String> = fresh
            .iter()
            .enumerate()
            .map(|(index, member)| {
                let name = truncate_name(&member.display_name);
                if numbered {
                    format!("{}. <@{}> - {}", index + 1, member.id.0, name)
                } else {
                    format!("<@{}> - {}", member.id.0, name)
                }
            })
            .collect();

        let title = format!("{:<width$}", entry.role.name, width = TITLE_WIDTH);
        for page in lines.chunks(MEMBERS_PER_PAGE) {
            units.push(RosterUnit {
                title: title.clone(),
                description: page.iter().join("\n"),
                colour: entry.role.colour,
            });
        }
    }

    units.push(RosterUnit {
        title: SUMMARY_TITLE.to_owned(),
        description: format!("Total members: {}", counted.len()),
        colour: Colour::DARK_PURPLE,
    });
    units
}
