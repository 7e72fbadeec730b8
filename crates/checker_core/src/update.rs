use crate::{Effect, Msg, RunState, SessionState, StopPolicy};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::ItemsLoaded(items) => {
            if items.is_empty() || state.session() != SessionState::Idle {
                return (state, Vec::new());
            }
            state.start(items.len());
            vec![Effect::StartRun { items }]
        }
        Msg::ItemChecked {
            group,
            title,
            is_live,
        } => {
            // Late events after RunFinished are ignored; the totals are final.
            match state.session() {
                SessionState::Running | SessionState::Finishing => {
                    state.apply_checked(group, title, is_live);
                }
                SessionState::Idle | SessionState::Finished => {}
            }
            Vec::new()
        }
        Msg::ProgressSampled { completed, .. } => {
            if state.session() != SessionState::Idle {
                state.apply_sample(completed);
            }
            Vec::new()
        }
        Msg::InterruptRequested => match state.session() {
            SessionState::Running => {
                state.note_interrupt();
                state.begin_finishing();
                vec![Effect::StopIntake {
                    policy: StopPolicy::Finish,
                }]
            }
            SessionState::Finishing => {
                // Only the second interrupt escalates; later ones repeat nothing.
                if state.note_interrupt() == 2 {
                    vec![Effect::StopIntake {
                        policy: StopPolicy::Immediate,
                    }]
                } else {
                    Vec::new()
                }
            }
            SessionState::Idle | SessionState::Finished => Vec::new(),
        },
        Msg::RunFinished { unchecked } => match state.session() {
            SessionState::Running | SessionState::Finishing => {
                state.finish(unchecked);
                vec![Effect::WriteResults]
            }
            SessionState::Idle | SessionState::Finished => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
