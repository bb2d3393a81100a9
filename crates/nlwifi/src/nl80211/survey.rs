//! Channel survey.

use super::consts::{Cmd, attr, survey_info};
use super::listener::ListenerRegistry;
use crate::netlink::{AttrTable, NlState, Result, Transport};

/// Channel occupancy counters for one frequency. Times are in ms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "output", derive(serde::Serialize))]
pub struct SurveyInfo {
    pub freq: u32,
    pub noise_dbm: Option<i8>,
    /// The interface is operating on this channel.
    pub in_use: bool,
    pub time: Option<u64>,
    pub time_busy: Option<u64>,
    pub time_ext_busy: Option<u64>,
    pub time_rx: Option<u64>,
    pub time_tx: Option<u64>,
    pub time_scan: Option<u64>,
}

impl SurveyInfo {
    pub fn parse(table: &AttrTable<'_>) -> Option<Self> {
        let info = table.nested(attr::SURVEY_INFO)?;
        Some(Self {
            freq: info.u32(survey_info::FREQUENCY)?,
            noise_dbm: info.i8(survey_info::NOISE),
            in_use: info.flag(survey_info::IN_USE),
            time: info.u64(survey_info::TIME),
            time_busy: info.u64(survey_info::TIME_BUSY),
            time_ext_busy: info.u64(survey_info::TIME_EXT_BUSY),
            time_rx: info.u64(survey_info::TIME_RX),
            time_tx: info.u64(survey_info::TIME_TX),
            time_scan: info.u64(survey_info::TIME_SCAN),
        })
    }

    /// Busy share of the active time, in percent.
    pub fn load(&self) -> Option<u8> {
        let (time, busy) = (self.time?, self.time_busy?);
        if time == 0 {
            return None;
        }
        Some((busy.min(time) * 100 / time) as u8)
    }
}

impl<T: Transport> NlState<T, ListenerRegistry> {
    /// Survey every channel the interface's radio has data for.
    pub async fn get_survey(&mut self, ifindex: u32) -> Result<Vec<SurveyInfo>> {
        let replies = self.request(Cmd::GetSurvey.dump().ifindex(ifindex)).await?;
        Ok(replies
            .iter()
            .filter_map(|r| SurveyInfo::parse(&r.table()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::AttrNode;
    use crate::netlink::fixtures::{MockTransport, done_frame, multi_frame};
    use crate::nl80211::testing::state;

    fn survey(freq: u32, in_use: bool) -> Vec<AttrNode> {
        let mut info = vec![
            AttrNode::u32(survey_info::FREQUENCY, freq),
            AttrNode::u8(survey_info::NOISE, (-92i8) as u8),
            AttrNode::u64(survey_info::TIME, 1000),
            AttrNode::u64(survey_info::TIME_BUSY, 250),
        ];
        if in_use {
            info.push(AttrNode::flag(survey_info::IN_USE));
        }
        vec![
            AttrNode::u32(attr::IFINDEX, 3),
            AttrNode::nested(attr::SURVEY_INFO, info),
        ]
    }

    #[tokio::test]
    async fn test_get_survey() {
        let mock = MockTransport::with_responder(|sent| {
            vec![
                multi_frame(sent.seq, Cmd::NewSurveyResults as u8, &survey(5180, true)),
                multi_frame(sent.seq, Cmd::NewSurveyResults as u8, &survey(5200, false)),
                // No survey info: skipped.
                multi_frame(sent.seq, Cmd::NewSurveyResults as u8, &[AttrNode::u32(attr::IFINDEX, 3)]),
                done_frame(sent.seq),
            ]
        });
        let mut state = state(&mock).await;
        let survey = state.get_survey(3).await.unwrap();
        assert_eq!(survey.len(), 2);
        assert!(survey[0].in_use);
        assert!(!survey[1].in_use);
        assert_eq!(survey[0].noise_dbm, Some(-92));
        assert_eq!(survey[0].load(), Some(25));
    }
}
