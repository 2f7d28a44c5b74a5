use tracing::warn;

/// Closed set of approval-chain roles. The numeric rank decides whether a
/// creator may skip an approval level: a level is skipped when the creator's
/// authority is at least the level's required authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    FirstLevelApprover,
    SecondLevelApprover,
    ThirdLevelApprover,
    FinalApprover,
    Admin,
}

/// Rank assigned to a stored role string the resolver does not recognize.
/// Strictly below every configured level, so an unmapped role never skips
/// anything and never blocks file creation.
pub const UNKNOWN_ROLE_AUTHORITY: i32 = 0;

/// Sentinel rank for Admin, above any realistic level requirement.
pub const ADMIN_AUTHORITY: i32 = 99;

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Initiator,
        Role::FirstLevelApprover,
        Role::SecondLevelApprover,
        Role::ThirdLevelApprover,
        Role::FinalApprover,
        Role::Admin,
    ];

    pub fn authority(self) -> i32 {
        match self {
            Role::Initiator => 1,
            Role::FirstLevelApprover => 2,
            Role::SecondLevelApprover => 3,
            Role::ThirdLevelApprover => 4,
            Role::FinalApprover => 5,
            Role::Admin => ADMIN_AUTHORITY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Initiator => "INITIATOR",
            Role::FirstLevelApprover => "FIRST_LEVEL_APPROVER",
            Role::SecondLevelApprover => "SECOND_LEVEL_APPROVER",
            Role::ThirdLevelApprover => "THIRD_LEVEL_APPROVER",
            Role::FinalApprover => "FINAL_APPROVER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|role| role.as_str() == name)
    }
}

/// Authority of a stored role string. Total: unknown names resolve to
/// [`UNKNOWN_ROLE_AUTHORITY`] with a configuration warning rather than an
/// error, so a stale role binding cannot block file creation.
pub fn authority_of_name(name: &str) -> i32 {
    match Role::from_name(name) {
        Some(role) => role.authority(),
        None => {
            warn!(role = name, "unmapped role name, using lowest authority");
            UNKNOWN_ROLE_AUTHORITY
        }
    }
}
