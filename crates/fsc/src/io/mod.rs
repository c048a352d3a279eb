//! File codecs for the core's external interfaces: the MPD
//! (point-estimate dump) file and the MCMC objective/sample streams.

pub mod mcmc_stream;
pub mod mpd;
