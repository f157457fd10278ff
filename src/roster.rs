use crate::models::{Role, RosterMember};

pub trait Roster {
    fn members(&self) -> Vec<RosterMember>;

    fn list_students(&self) -> Vec<RosterMember> {
        self.members()
            .into_iter()
            .filter(|member| member.role == Role::Student)
            .collect()
    }

    fn find(&self, id: &str) -> Option<RosterMember> {
        self.members().into_iter().find(|member| member.id == id)
    }

    fn find_student(&self, id: &str) -> Option<RosterMember> {
        self.find(id).filter(|member| member.role == Role::Student)
    }
}

#[derive(Debug, Clone)]
pub struct StaticRoster {
    members: Vec<RosterMember>,
}

impl StaticRoster {
    pub fn new(members: Vec<RosterMember>) -> Self {
        Self { members }
    }
}

impl Default for StaticRoster {
    fn default() -> Self {
        let member = |id: &str, name: &str, role: Role, email: &str| RosterMember {
            id: id.to_string(),
            name: name.to_string(),
            role,
            email: email.to_string(),
        };

        Self::new(vec![
            member("1", "Ana Silva", Role::Student, "ana@escola.com"),
            member("2", "Carlos Santos", Role::Student, "carlos@escola.com"),
            member("3", "Maria Oliveira", Role::Teacher, "maria@escola.com"),
            member("4", "João Costa", Role::Psychologist, "joao@escola.com"),
        ])
    }
}

impl Roster for StaticRoster {
    fn members(&self) -> Vec<RosterMember> {
        self.members.clone()
    }
}
