use indexmap::IndexMap;

/// Identifier of a chat participant as assigned by the chat platform.
pub type ParticipantId = i64;

/// Points and display identity accumulated by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Number of correct answers credited so far.
    pub point: u32,
    /// Display name shown in the final ranking.
    pub full_name: String,
    /// Platform username, possibly empty.
    pub username: String,
}

/// Identity of a participant whose answer was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Platform identifier of the participant.
    pub id: ParticipantId,
    /// Display name at the time of answering.
    pub full_name: String,
    /// Platform username, possibly empty.
    pub username: String,
}

/// Per-session tally of participants, kept in first-seen order.
///
/// The insertion order doubles as the tie-break when ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    scores: IndexMap<ParticipantId, Score>,
}

impl ScoreBoard {
    /// Empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit one point to `participant`, returning their new total.
    ///
    /// The display identity is refreshed on every call so renames show up in
    /// the final ranking.
    pub fn record_correct(&mut self, participant: &Participant) -> u32 {
        let score = self
            .scores
            .entry(participant.id)
            .and_modify(|score| {
                score.point = score.point.saturating_add(1);
                score.full_name.clone_from(&participant.full_name);
                score.username.clone_from(&participant.username);
            })
            .or_insert_with(|| Score {
                point: 1,
                full_name: participant.full_name.clone(),
                username: participant.username.clone(),
            });
        score.point
    }

    /// Insert a score restored from a snapshot, replacing any existing entry
    /// while keeping its position.
    pub fn restore(&mut self, id: ParticipantId, score: Score) {
        self.scores.insert(id, score);
    }

    /// Current score of `id`, if they have answered at least once.
    pub fn get(&self, id: ParticipantId) -> Option<&Score> {
        self.scores.get(&id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &Score)> {
        self.scores.iter().map(|(id, score)| (*id, score))
    }

    /// Number of participants with at least one point.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nobody has scored yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Entries sorted by descending point; ties keep insertion order.
    pub fn rank(&self) -> Vec<(ParticipantId, &Score)> {
        let mut ranking = self.iter().collect::<Vec<_>>();
        // `sort_by` is stable, which is what keeps the insertion-order tie-break.
        ranking.sort_by(|(_, a), (_, b)| b.point.cmp(&a.point));
        ranking
    }
}
