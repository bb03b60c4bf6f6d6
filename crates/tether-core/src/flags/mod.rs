//! Public-flags decoding
//!
//! The upstream sends `public_flags` as an integer bitset; the public
//! projection exposes it as a list of semantic labels.

use bitflags::bitflags;

bitflags! {
    /// Discord public user flags relayed by Tether
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PublicFlags: u64 {
        const DISCORD_EMPLOYEE             = 1;
        const PARTNERED_SERVER_OWNER       = 1 << 1;
        const HYPESQUAD_EVENTS             = 1 << 2;
        const BUG_HUNTER_LEVEL_1           = 1 << 3;
        const HOUSE_BRAVERY                = 1 << 6;
        const HOUSE_BRILLIANCE             = 1 << 7;
        const HOUSE_BALANCE                = 1 << 8;
        const EARLY_SUPPORTER              = 1 << 9;
        const BUG_HUNTER_LEVEL_2           = 1 << 14;
        const EARLY_VERIFIED_BOT_DEVELOPER = 1 << 17;
        const DISCORD_CERTIFIED_MODERATOR  = 1 << 18;
        const ACTIVE_DEVELOPER             = 1 << 22;
    }
}

/// Label table in ascending bit order
const FLAG_LABELS: &[(PublicFlags, &str)] = &[
    (PublicFlags::DISCORD_EMPLOYEE, "Discord_Employee"),
    (PublicFlags::PARTNERED_SERVER_OWNER, "Partnered_Server_Owner"),
    (PublicFlags::HYPESQUAD_EVENTS, "HypeSquad_Events"),
    (PublicFlags::BUG_HUNTER_LEVEL_1, "Bug_Hunter_Level_1"),
    (PublicFlags::HOUSE_BRAVERY, "House_Bravery"),
    (PublicFlags::HOUSE_BRILLIANCE, "House_Brilliance"),
    (PublicFlags::HOUSE_BALANCE, "House_Balance"),
    (PublicFlags::EARLY_SUPPORTER, "Early_Supporter"),
    (PublicFlags::BUG_HUNTER_LEVEL_2, "Bug_Hunter_Level_2"),
    (PublicFlags::EARLY_VERIFIED_BOT_DEVELOPER, "Early_Verified_Bot_Developer"),
    (PublicFlags::DISCORD_CERTIFIED_MODERATOR, "Discord_Certified_Moderator"),
    (PublicFlags::ACTIVE_DEVELOPER, "Active_Developer"),
];

impl PublicFlags {
    /// The semantic labels of the set flags, in ascending bit order.
    ///
    /// Unknown bits are ignored so new upstream flags don't break
    /// decoding.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        FLAG_LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect()
    }
}

/// Decode a raw bitset into semantic labels.
#[must_use]
pub fn flag_names(bits: u64) -> Vec<&'static str> {
    PublicFlags::from_bits_truncate(bits).names()
}
