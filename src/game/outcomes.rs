//! Outcome handlers.
//!
//! Immediate kinds apply their effect and return the report to emit. Interactive kinds open a
//! session and return `None`; their report comes from [`Engine::resolve_pending`] or
//! [`Engine::expired_report`] once the session leaves `Pending`.
//!
//! Debits always go through [`debit_clamped`], so no path here can push a balance below zero.

use log::{error, info, warn};
use rand::seq::SliceRandom;

use super::content::{TemplateKey, TriviaQuestion, Vars};
use super::effects::{
    coin_flip, roll_rooms, steal_penalty, steal_succeeds, steal_take, trivia_delta, Room,
    DOOR_COUNT,
};
use super::engine::{Engine, TriggerContext};
use super::host::OutcomeReport;
use super::ledger::debit_clamped;
use super::outcome::OutcomeKind;
use crate::logutil::escape_log;

/// Most marks offered by one steal.
pub const MAX_STEAL_TARGETS: usize = 4;

/// A steal candidate as shown on its button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub subject: String,
    pub name: String,
}

/// State an interactive outcome carries while it waits for its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    DoubleOrNothing {
        stake: i64,
    },
    Steal {
        amount: i64,
        penalty: i64,
        marks: Vec<Mark>,
    },
    Trivia {
        question: TriviaQuestion,
    },
    /// Doors are rolled when the session opens.
    Rooms {
        doors: [Room; DOOR_COUNT],
    },
}

impl Pending {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Pending::DoubleOrNothing { .. } => OutcomeKind::DoubleOrNothing,
            Pending::Steal { .. } => OutcomeKind::Steal,
            Pending::Trivia { .. } => OutcomeKind::TriviaChallenge,
            Pending::Rooms { .. } => OutcomeKind::ExploreRooms,
        }
    }

    /// Button labels, in choice-index order.
    pub fn options(&self) -> Vec<String> {
        match self {
            Pending::DoubleOrNothing { .. } => {
                vec!["🪙 Flip".to_string(), "🚶 Walk away".to_string()]
            }
            Pending::Steal { marks, .. } => marks
                .iter()
                .map(|m| m.name.clone())
                .chain(std::iter::once("😇 Back off".to_string()))
                .collect(),
            Pending::Trivia { question } => question.options.clone(),
            Pending::Rooms { .. } => (1..=DOOR_COUNT).map(|n| format!("🚪 Door {}", n)).collect(),
        }
    }

    pub fn option_count(&self) -> usize {
        match self {
            Pending::DoubleOrNothing { .. } => 2,
            Pending::Steal { marks, .. } => marks.len() + 1,
            Pending::Trivia { question } => question.options.len(),
            Pending::Rooms { .. } => DOOR_COUNT,
        }
    }
}

fn report(user: &str, kind: OutcomeKind, text: String, delta: i64, balance: Option<i64>) -> OutcomeReport {
    OutcomeReport {
        user: user.to_string(),
        kind,
        text,
        delta,
        balance,
        attachment: None,
    }
}

impl Engine {
    pub(super) async fn jackpot_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let kind = OutcomeKind::Jackpot;
        let name = self.name_of(&ctx.user).await;
        if !self.jackpot.try_claim() {
            info!("jackpot: already claimed, nothing for {}", escape_log(&ctx.user));
            let text = self.line(TemplateKey::JackpotClaimed, &Vars::user(&name));
            return Some(report(&ctx.user, kind, text, 0, None));
        }
        let amount = self.ranges.jackpot.amount;
        match self.ledger.adjust_balance(&ctx.user, amount, kind.key()).await {
            Ok(balance) => {
                info!("jackpot: claimed by {} ({})", escape_log(&ctx.user), amount);
                let vars = Vars::user(&name).amount(amount).balance(balance);
                let text = self.line(TemplateKey::JackpotWin, &vars);
                Some(report(&ctx.user, kind, text, amount, Some(balance)))
            }
            Err(e) => {
                // Nobody got paid, so nobody has claimed it.
                self.jackpot.release();
                Some(self.ledger_failure(&ctx.user, &name, kind, &e))
            }
        }
    }

    pub(super) async fn strip_all_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let kind = OutcomeKind::StripAllBalance;
        let name = self.name_of(&ctx.user).await;
        match debit_clamped(&*self.ledger, &ctx.user, i64::MAX, kind.key()).await {
            Ok(debit) if debit.amount == 0 => {
                let text = self.line(TemplateKey::StripAllEmpty, &Vars::user(&name));
                Some(report(&ctx.user, kind, text, 0, Some(debit.new_balance)))
            }
            Ok(debit) => {
                let vars = Vars::user(&name).amount(debit.amount).balance(debit.new_balance);
                let text = self.line(TemplateKey::StripAll, &vars);
                Some(report(&ctx.user, kind, text, -debit.amount, Some(debit.new_balance)))
            }
            Err(e) => Some(self.ledger_failure(&ctx.user, &name, kind, &e)),
        }
    }

    pub(super) async fn add_outcome(
        &mut self,
        ctx: &TriggerContext,
        kind: OutcomeKind,
    ) -> Option<OutcomeReport> {
        let (range, key) = match kind {
            OutcomeKind::AddHigh => (self.ranges.add_high, TemplateKey::AddHigh),
            _ => (self.ranges.add_low, TemplateKey::AddLow),
        };
        let amount = range.sample(&mut self.rng);
        let name = self.name_of(&ctx.user).await;
        match self.ledger.adjust_balance(&ctx.user, amount, kind.key()).await {
            Ok(balance) => {
                let text = self.line(key, &Vars::user(&name).amount(amount).balance(balance));
                Some(report(&ctx.user, kind, text, amount, Some(balance)))
            }
            Err(e) => Some(self.ledger_failure(&ctx.user, &name, kind, &e)),
        }
    }

    pub(super) async fn remove_outcome(
        &mut self,
        ctx: &TriggerContext,
        kind: OutcomeKind,
    ) -> Option<OutcomeReport> {
        let (range, key) = match kind {
            OutcomeKind::RemoveHigh => (self.ranges.remove_high, TemplateKey::RemoveHigh),
            _ => (self.ranges.remove_low, TemplateKey::RemoveLow),
        };
        let requested = range.sample(&mut self.rng);
        let name = self.name_of(&ctx.user).await;
        match debit_clamped(&*self.ledger, &ctx.user, requested, kind.key()).await {
            Ok(debit) if debit.amount == 0 => {
                let text = self.line(TemplateKey::RemoveEmpty, &Vars::user(&name));
                Some(report(&ctx.user, kind, text, 0, Some(debit.new_balance)))
            }
            Ok(debit) => {
                let vars = Vars::user(&name).amount(debit.amount).balance(debit.new_balance);
                let text = self.line(key, &vars);
                Some(report(&ctx.user, kind, text, -debit.amount, Some(debit.new_balance)))
            }
            Err(e) => Some(self.ledger_failure(&ctx.user, &name, kind, &e)),
        }
    }

    pub(super) async fn joke_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let name = self.name_of(&ctx.user).await;
        let intro = self.line(TemplateKey::JokeIntro, &Vars::user(&name));
        let text = match self.content.joke(&mut self.rng) {
            Some(joke) => format!("{}\n{}", intro, joke),
            None => {
                warn!("content: joke list is empty");
                intro
            }
        };
        Some(report(&ctx.user, OutcomeKind::Joke, text, 0, None))
    }

    pub(super) async fn media_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let name = self.name_of(&ctx.user).await;
        let text = self.line(TemplateKey::MediaIntro, &Vars::user(&name));
        let attachment = self.content.media(&mut self.rng);
        if attachment.is_none() {
            warn!("content: media list is empty");
        }
        let mut out = report(&ctx.user, OutcomeKind::MediaClip, text, 0, None);
        out.attachment = attachment;
        Some(out)
    }

    pub(super) async fn double_or_nothing_outcome(
        &mut self,
        ctx: &TriggerContext,
    ) -> Option<OutcomeReport> {
        let stake = self.ranges.double_or_nothing.sample(&mut self.rng);
        let name = self.name_of(&ctx.user).await;
        let text = self.line(TemplateKey::DoubleOffer, &Vars::user(&name).amount(stake));
        self.open_session(
            &ctx.user,
            OutcomeKind::DoubleOrNothing,
            text,
            Pending::DoubleOrNothing { stake },
        )
        .await;
        None
    }

    pub(super) async fn steal_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let kind = OutcomeKind::Steal;
        let mut pool: Vec<&String> = ctx.candidates.iter().filter(|c| **c != ctx.user).collect();
        pool.sort();
        pool.dedup();
        let picked: Vec<String> = pool
            .choose_multiple(&mut self.rng, MAX_STEAL_TARGETS)
            .map(|s| s.to_string())
            .collect();

        let mut marks = Vec::with_capacity(picked.len());
        for subject in picked {
            // Unknown subjects cannot be debited, so they are not offered.
            match self.ledger.display_name(&subject).await {
                Ok(name) => marks.push(Mark { subject, name }),
                Err(e) => warn!("steal: skipping candidate {}: {}", escape_log(&subject), e),
            }
        }

        let name = self.name_of(&ctx.user).await;
        if marks.is_empty() {
            let text = self.line(TemplateKey::StealNoTargets, &Vars::user(&name));
            return Some(report(&ctx.user, kind, text, 0, None));
        }

        let amount = self.ranges.steal.sample(&mut self.rng);
        let penalty = steal_penalty(amount);
        let vars = Vars::user(&name).amount(amount).penalty(penalty);
        let text = self.line(TemplateKey::StealOffer, &vars);
        self.open_session(&ctx.user, kind, text, Pending::Steal { amount, penalty, marks })
            .await;
        None
    }

    pub(super) async fn trivia_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let question = match self.content.question(&mut self.rng) {
            Some(q) => q,
            None => {
                warn!("content: no trivia questions, telling a joke instead");
                return self.joke_outcome(ctx).await;
            }
        };
        let name = self.name_of(&ctx.user).await;
        let vars = Vars::user(&name).question(&question.question);
        let text = self.line(TemplateKey::TriviaOffer, &vars);
        self.open_session(
            &ctx.user,
            OutcomeKind::TriviaChallenge,
            text,
            Pending::Trivia { question },
        )
        .await;
        None
    }

    pub(super) async fn rooms_outcome(&mut self, ctx: &TriggerContext) -> Option<OutcomeReport> {
        let doors = roll_rooms(&mut self.rng);
        let name = self.name_of(&ctx.user).await;
        let text = self.line(TemplateKey::RoomsOffer, &Vars::user(&name));
        self.open_session(&ctx.user, OutcomeKind::ExploreRooms, text, Pending::Rooms { doors })
            .await;
        None
    }

    /// Apply the owner's choice. Returns the report and, for dramatic kinds, a suspense line.
    pub(super) async fn resolve_pending(
        &mut self,
        user: &str,
        payload: Pending,
        choice: usize,
    ) -> (OutcomeReport, Option<String>) {
        let name = self.name_of(user).await;
        match payload {
            Pending::DoubleOrNothing { stake } => self.double_or_nothing(user, &name, stake, choice).await,
            Pending::Steal {
                amount,
                penalty,
                marks,
            } => match marks.get(choice) {
                Some(mark) => self.steal(user, &name, mark, amount, penalty).await,
                None => {
                    let text = self.line(TemplateKey::StealBackOff, &Vars::user(&name));
                    (report(user, OutcomeKind::Steal, text, 0, None), None)
                }
            },
            Pending::Trivia { question } => (self.trivia(user, &name, &question, choice).await, None),
            Pending::Rooms { doors } => (self.rooms(user, &name, doors[choice]).await, None),
        }
    }

    async fn double_or_nothing(
        &mut self,
        user: &str,
        name: &str,
        stake: i64,
        choice: usize,
    ) -> (OutcomeReport, Option<String>) {
        let kind = OutcomeKind::DoubleOrNothing;
        if choice != 0 {
            let text = self.line(TemplateKey::DoubleWalk, &Vars::user(name));
            return (report(user, kind, text, 0, None), None);
        }
        let suspense = Some(self.line(TemplateKey::DoubleSuspense, &Vars::user(name)));
        if coin_flip(&mut self.rng) {
            match self.ledger.adjust_balance(user, stake, kind.key()).await {
                Ok(balance) => {
                    let vars = Vars::user(name).amount(stake).balance(balance);
                    let text = self.line(TemplateKey::DoubleWin, &vars);
                    (report(user, kind, text, stake, Some(balance)), suspense)
                }
                Err(e) => (self.ledger_failure(user, name, kind, &e), None),
            }
        } else {
            match debit_clamped(&*self.ledger, user, stake, kind.key()).await {
                Ok(debit) => {
                    let vars = Vars::user(name).amount(debit.amount).balance(debit.new_balance);
                    let text = self.line(TemplateKey::DoubleLose, &vars);
                    (report(user, kind, text, -debit.amount, Some(debit.new_balance)), suspense)
                }
                Err(e) => (self.ledger_failure(user, name, kind, &e), None),
            }
        }
    }

    /// Debit the mark first, then credit the thief; a failed credit refunds the mark.
    async fn steal(
        &mut self,
        user: &str,
        name: &str,
        mark: &Mark,
        amount: i64,
        penalty: i64,
    ) -> (OutcomeReport, Option<String>) {
        let kind = OutcomeKind::Steal;
        let target_balance = match self.ledger.balance(&mark.subject).await {
            Ok(balance) => balance,
            Err(e) => return (self.ledger_failure(user, name, kind, &e), None),
        };
        let suspense = Some(self.line(
            TemplateKey::StealSuspense,
            &Vars::user(name).target(&mark.name),
        ));

        if steal_succeeds(target_balance, &mut self.rng) {
            let take = steal_take(amount, target_balance);
            let taken = match debit_clamped(&*self.ledger, &mark.subject, take, "steal_victim").await {
                Ok(debit) => debit.amount,
                Err(e) => return (self.ledger_failure(user, name, kind, &e), None),
            };
            if taken > 0 {
                match self.ledger.adjust_balance(user, taken, kind.key()).await {
                    Ok(balance) => {
                        info!(
                            "steal: {} took {} from {}",
                            escape_log(user),
                            taken,
                            escape_log(&mark.subject)
                        );
                        let vars = Vars::user(name).target(&mark.name).amount(taken).balance(balance);
                        let text = self.line(TemplateKey::StealSuccess, &vars);
                        return (report(user, kind, text, taken, Some(balance)), suspense);
                    }
                    Err(e) => {
                        if let Err(refund) = self
                            .ledger
                            .adjust_balance(&mark.subject, taken, "steal_refund")
                            .await
                        {
                            error!(
                                "steal: refund of {} to {} failed after credit error: {}",
                                taken,
                                escape_log(&mark.subject),
                                refund
                            );
                        }
                        return (self.ledger_failure(user, name, kind, &e), None);
                    }
                }
            }
            // The mark was emptied between the roll and the debit: treat as caught.
        }

        match debit_clamped(&*self.ledger, user, penalty, "steal_penalty").await {
            Ok(debit) => {
                let vars = Vars::user(name)
                    .target(&mark.name)
                    .penalty(debit.amount)
                    .balance(debit.new_balance);
                let text = self.line(TemplateKey::StealFail, &vars);
                (report(user, kind, text, -debit.amount, Some(debit.new_balance)), suspense)
            }
            Err(e) => (self.ledger_failure(user, name, kind, &e), None),
        }
    }

    async fn trivia(
        &mut self,
        user: &str,
        name: &str,
        question: &TriviaQuestion,
        choice: usize,
    ) -> OutcomeReport {
        let kind = OutcomeKind::TriviaChallenge;
        let correct = choice == question.answer;
        let trivia = self.ranges.trivia;
        let delta = trivia_delta(
            correct,
            &trivia.correct(),
            &trivia.penalty(),
            trivia.penalty_chance,
            &mut self.rng,
        );
        let answer = question.options.get(question.answer).map(String::as_str);

        match delta {
            Some(reward) if reward > 0 => match self.ledger.adjust_balance(user, reward, kind.key()).await {
                Ok(balance) => {
                    let vars = Vars::user(name).amount(reward).balance(balance);
                    let text = self.line(TemplateKey::TriviaCorrect, &vars);
                    report(user, kind, text, reward, Some(balance))
                }
                Err(e) => self.ledger_failure(user, name, kind, &e),
            },
            Some(fine) => match debit_clamped(&*self.ledger, user, -fine, kind.key()).await {
                Ok(debit) if debit.amount > 0 => {
                    let vars = Vars::user(name)
                        .amount(debit.amount)
                        .balance(debit.new_balance)
                        .answer(answer);
                    let text = self.line(TemplateKey::TriviaWrongPenalty, &vars);
                    report(user, kind, text, -debit.amount, Some(debit.new_balance))
                }
                Ok(debit) => {
                    let text = self.line(TemplateKey::TriviaWrong, &Vars::user(name).answer(answer));
                    report(user, kind, text, 0, Some(debit.new_balance))
                }
                Err(e) => self.ledger_failure(user, name, kind, &e),
            },
            None => {
                let text = self.line(TemplateKey::TriviaWrong, &Vars::user(name).answer(answer));
                report(user, kind, text, 0, None)
            }
        }
    }

    async fn rooms(&mut self, user: &str, name: &str, room: Room) -> OutcomeReport {
        let kind = OutcomeKind::ExploreRooms;
        match room {
            Room::Treasure => {
                let amount = self.ranges.backrooms.treasure().sample(&mut self.rng);
                match self.ledger.adjust_balance(user, amount, "backrooms_treasure").await {
                    Ok(balance) => {
                        let vars = Vars::user(name).amount(amount).balance(balance);
                        let text = self.line(TemplateKey::RoomsTreasure, &vars);
                        report(user, kind, text, amount, Some(balance))
                    }
                    Err(e) => self.ledger_failure(user, name, kind, &e),
                }
            }
            Room::Monster => {
                let requested = self.ranges.backrooms.monster().sample(&mut self.rng);
                match debit_clamped(&*self.ledger, user, requested, "backrooms_monster").await {
                    Ok(debit) if debit.amount == 0 => {
                        let text = self.line(TemplateKey::RoomsLucky, &Vars::user(name));
                        report(user, kind, text, 0, Some(debit.new_balance))
                    }
                    Ok(debit) => {
                        let vars = Vars::user(name).amount(debit.amount).balance(debit.new_balance);
                        let text = self.line(TemplateKey::RoomsMonster, &vars);
                        report(user, kind, text, -debit.amount, Some(debit.new_balance))
                    }
                    Err(e) => self.ledger_failure(user, name, kind, &e),
                }
            }
            Room::Escape => {
                let text = self.line(TemplateKey::RoomsEscape, &Vars::user(name));
                report(user, kind, text, 0, None)
            }
        }
    }

    /// The single result of a session that ran out of time. Nothing moves.
    pub(super) async fn expired_report(&mut self, owner: &str, payload: &Pending) -> OutcomeReport {
        let name = self.name_of(owner).await;
        let vars = Vars::user(&name);
        let text = match payload {
            Pending::DoubleOrNothing { .. } => self.line(TemplateKey::DoubleExpired, &vars),
            Pending::Steal { .. } => self.line(TemplateKey::StealExpired, &vars),
            Pending::Trivia { question } => {
                let answer = question.options.get(question.answer).map(String::as_str);
                self.line(TemplateKey::TriviaExpired, &vars.clone().answer(answer))
            }
            Pending::Rooms { .. } => self.line(TemplateKey::RoomsExpired, &vars),
        };
        report(owner, payload.kind(), text, 0, None)
    }
}
