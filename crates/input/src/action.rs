/// A request coming from the host UI rather than the keyboard.
///
/// The runtime consumes actions, never raw widget events, so any front end
/// (debug panel, CLI, test) drives the scene the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Spawn a box of random size above the floor.
    SpawnRandomBox,
    /// Spawn a sphere of random radius above the floor.
    SpawnRandomSphere,
    /// Show or hide the auxiliary entities.
    SetAuxiliaryVisible(bool),
    /// Stop the simulation loop.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_compare_by_payload() {
        assert_eq!(
            Action::SetAuxiliaryVisible(true),
            Action::SetAuxiliaryVisible(true)
        );
        assert_ne!(
            Action::SetAuxiliaryVisible(true),
            Action::SetAuxiliaryVisible(false)
        );
        assert!(matches!(Action::SpawnRandomBox, Action::SpawnRandomBox));
    }
}
