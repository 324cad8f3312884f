/// Which side of the payoff matrix a player acts on in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Row,
    Col,
}

impl Role {
    pub const fn all() -> [Role; 2] {
        [Role::Row, Role::Col]
    }
    pub fn opponent(&self) -> Role {
        match self {
            Role::Row => Role::Col,
            Role::Col => Role::Row,
        }
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> Self {
        match role {
            Role::Row => 0,
            Role::Col => 1,
        }
    }
}

impl TryFrom<i16> for Role {
    type Error = anyhow::Error;
    fn try_from(n: i16) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Role::Row),
            1 => Ok(Role::Col),
            _ => Err(anyhow::anyhow!("invalid role {}", n)),
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = anyhow::Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "row" | "p1" => Ok(Role::Row),
            "col" | "column" | "p2" => Ok(Role::Col),
            _ => Err(anyhow::anyhow!("invalid role {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Row => write!(f, "row"),
            Role::Col => write!(f, "col"),
        }
    }
}
